//! Embedded schema migrations.
//!
//! Each migration is an up/down pair of SQL files compiled into the binary.
//! Every file is idempotent and runs as one batch.

use deadpool_postgres::Pool;
use orderflow_core::{ConfigError, OrderflowResult, StorageError};
use std::str::FromStr;

/// One named schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// All migrations, ascending by name.
pub static MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_init",
    up: include_str!("../migrations/0001_init.up.sql"),
    down: include_str!("../migrations/0001_init.down.sql"),
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(ConfigError::InvalidValue {
                field: "direction".to_string(),
                value: other.to_string(),
                reason: "expected 'up' or 'down'".to_string(),
            }),
        }
    }
}

/// The `(name, sql)` batches to run, in execution order.
pub fn plan(direction: Direction) -> Vec<(&'static str, &'static str)> {
    match direction {
        Direction::Up => MIGRATIONS.iter().map(|m| (m.name, m.up)).collect(),
        Direction::Down => MIGRATIONS.iter().rev().map(|m| (m.name, m.down)).collect(),
    }
}

/// Apply every migration in `direction`. Returns the names that ran.
pub async fn run(pool: &Pool, direction: Direction) -> OrderflowResult<Vec<&'static str>> {
    let conn = pool.get().await.map_err(|e| StorageError::Unavailable {
        reason: e.to_string(),
    })?;

    let mut applied = Vec::new();
    for (name, sql) in plan(direction) {
        conn.batch_execute(sql)
            .await
            .map_err(|e| StorageError::MigrationFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(migration = name, direction = ?direction, "migration applied");
        applied.push(name);
    }
    Ok(applied)
}

//! Command implementations for the CLI
//!
//! - query: PromQL instant and range queries
//! - logs: LogQL range queries
//! - backends: list registered backend kinds
//! - check: readiness check against the configured backend

pub mod backends;
pub mod check;
pub mod logs;
pub mod query;

use anyhow::Result;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! `procpool.toml` configuration.
//!
//! - `types`: serde structs for each section
//! - `loading`: parsing, env overrides, and conversion into tasks and conditions
//! - `validation`: semantic checks run after parsing

mod loading;
mod types;
mod validation;


pub use types::{ConditionsConfig, PoolConfig, PoolSection, TaskConfig};

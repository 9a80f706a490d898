//! Pool scheduler runner.
//!
//! Split into focused submodules:
//! - `core`: PoolScheduler struct, builder methods, conditional registration, accessors
//! - `execution`: run entry points, the poll loop, and stop-all

mod core;
mod execution;
#[cfg(test)]
mod tests;

pub use self::core::PoolScheduler;

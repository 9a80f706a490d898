//! Gating conditions re-evaluated on every poll tick.
//!
//! Any `FnMut() -> bool` closure is a [`Predicate`]. Closures that can fail
//! are wrapped with [`fallible`]; their errors abort the run. [`StopFile`] and
//! [`Deadline`] cover the two conditions the CLI exposes.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

/// A zero-argument boolean oracle. `Ok(false)` vetoes the current run.
pub trait Predicate: Send {
    fn evaluate(&mut self) -> anyhow::Result<bool>;
}

impl<F> Predicate for F
where
    F: FnMut() -> bool + Send,
{
    fn evaluate(&mut self) -> anyhow::Result<bool> {
        Ok(self())
    }
}

/// Predicate backed by a closure that may fail.
pub struct Fallible<F>(F);

/// Wrap a fallible closure as a [`Predicate`].
pub fn fallible<F>(f: F) -> Fallible<F>
where
    F: FnMut() -> anyhow::Result<bool> + Send,
{
    Fallible(f)
}

impl<F> Predicate for Fallible<F>
where
    F: FnMut() -> anyhow::Result<bool> + Send,
{
    fn evaluate(&mut self) -> anyhow::Result<bool> {
        (self.0)()
    }
}

/// Allows the run to continue while `path` does not exist.
#[derive(Debug, Clone)]
pub struct StopFile {
    path: PathBuf,
}

impl StopFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Predicate for StopFile {
    fn evaluate(&mut self) -> anyhow::Result<bool> {
        Ok(!self.path.exists())
    }
}

/// Allows the run to continue until a fixed instant has passed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Deadline `after` from now.
    pub fn after(after: Duration) -> Self {
        Self::at(Instant::now() + after)
    }
}

impl Predicate for Deadline {
    fn evaluate(&mut self) -> anyhow::Result<bool> {
        Ok(Instant::now() < self.at)
    }
}

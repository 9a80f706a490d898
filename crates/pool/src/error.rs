use thiserror::Error;

/// Errors returned by the pool scheduler and its configuration layer.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("conditional #{index} failed: {source}")]
    Predicate {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

/// Failure to start a [`Runnable`](crate::Runnable).
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn task '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{0}' was already started")]
    AlreadyStarted(String),

    #[error("task '{task}' refused to start: {reason}")]
    Rejected { task: String, reason: String },
}

impl LaunchError {
    /// Name of the task that failed to launch.
    pub fn task(&self) -> &str {
        match self {
            LaunchError::Spawn { task, .. } => task,
            LaunchError::AlreadyStarted(task) => task,
            LaunchError::Rejected { task, .. } => task,
        }
    }
}

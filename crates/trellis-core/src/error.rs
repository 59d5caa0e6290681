//! Error types for Trellis.

use std::fmt;

use crate::service::ServiceError;

/// The main error type for Trellis core operations.
#[derive(Debug)]
pub enum CoreError {
    /// Application has already been initialized.
    ApplicationAlreadyInitialized,
    /// Application has not been initialized yet.
    ApplicationNotInitialized,
    /// The event queue has shut down and no longer accepts events.
    EventQueueClosed,
    /// Timer-related error.
    Timer(TimerError),
    /// Thread-pool related error.
    Pool(ThreadPoolError),
    /// Task-service related error.
    Service(ServiceError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApplicationAlreadyInitialized => {
                write!(f, "Application has already been initialized")
            }
            Self::ApplicationNotInitialized => {
                write!(f, "Application has not been initialized. Call Application::new() first")
            }
            Self::EventQueueClosed => {
                write!(f, "The event queue has shut down")
            }
            Self::Timer(err) => write!(f, "Timer error: {err}"),
            Self::Pool(err) => write!(f, "Thread pool error: {err}"),
            Self::Service(err) => write!(f, "Task service error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timer(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

/// Timer-specific errors.
#[derive(Debug)]
pub enum TimerError {
    /// The timer ID is invalid or has already been removed.
    InvalidTimerId,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimerId => write!(f, "Invalid or expired timer ID"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for CoreError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

/// Thread-pool specific errors.
#[derive(Debug)]
pub enum ThreadPoolError {
    /// The underlying pool could not be constructed.
    CreationFailed(String),
}

impl fmt::Display for ThreadPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreationFailed(msg) => write!(f, "Failed to create thread pool: {msg}"),
        }
    }
}

impl std::error::Error for ThreadPoolError {}

impl From<ThreadPoolError> for CoreError {
    fn from(err: ThreadPoolError) -> Self {
        Self::Pool(err)
    }
}

impl From<ServiceError> for CoreError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

/// A specialized Result type for Trellis core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

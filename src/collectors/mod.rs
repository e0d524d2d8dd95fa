pub mod services;
pub mod system;

use thiserror::Error;
use tokio::task::JoinError;

/// A collector task that did not return a record.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{collector} collector panicked: {message}")]
    Panicked {
        collector: &'static str,
        message: String,
    },
    #[error("{collector} collector was cancelled")]
    Cancelled { collector: &'static str },
}

impl CollectError {
    pub fn from_join(collector: &'static str, err: JoinError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled { collector };
        }
        let payload = err.into_panic();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked { collector, message }
    }
}

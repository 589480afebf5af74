//! Logging utilities for structured tracing

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for a host application.
///
/// Honors `RUST_LOG` when set, otherwise defaults to debug output for this
/// crate only.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("collabstream=debug")),
        )
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Times a pipeline stage and logs its duration on drop.
pub struct Timer {
    start: Instant,
    stage: String,
}

impl Timer {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            stage: stage.into(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        tracing::debug!(
            stage = %self.stage,
            duration_ms = self.elapsed_ms(),
            "Pipeline stage completed"
        );
    }
}

/// Log an error with structured context
pub fn log_error(operation: &str, error: &impl std::error::Error) {
    tracing::error!(
        operation = %operation,
        error = %error,
        error_kind = std::any::type_name_of_val(error),
        "Operation failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollabStreamError;
    use crate::model::EntityKind;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timer_measures_stage_duration() {
        let timer = Timer::new("dispatch_posts");
        thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        // Drop logs the final duration
    }

    #[test]
    fn test_log_error_accepts_crate_errors() {
        let error = CollabStreamError::NotFound {
            kind: EntityKind::Teams,
            id: "t1".to_string(),
        };
        log_error("dispatch_teams", &error);
    }
}

/// Progress reporting for long running tasks.
///
/// Reporters are advisory only: nothing in the resolver depends on what they do.
#[cfg_attr(test, mockall::automock)]
pub trait TaskReporter: Send + Sync {
    /// Begin a named task
    fn start(&self, name: &str);

    /// Report progress on the current task
    fn update(&self, status: &str);

    /// Finish the current task
    fn end(&self);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl TaskReporter for NullReporter {
    fn start(&self, _name: &str) {}

    fn update(&self, _status: &str) {}

    fn end(&self) {}
}

/// Reporter that forwards task events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn start(&self, name: &str) {
        tracing::info!(task = name, "started");
    }

    fn update(&self, status: &str) {
        tracing::debug!(status, "progress");
    }

    fn end(&self) {
        tracing::debug!("task finished");
    }
}

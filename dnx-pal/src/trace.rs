//! Trace sink used while loading the host module

/// Receives bootstrap trace events
pub trait TraceWriter {
    /// Record a trace message. `verbose_only` messages are only wanted when
    /// tracing was switched on with `DNX_TRACE`.
    fn write(&self, message: &str, verbose_only: bool);
}

/// Trace writer backed by the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceWriter {
    verbose: bool,
}

impl LogTraceWriter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TraceWriter for LogTraceWriter {
    fn write(&self, message: &str, verbose_only: bool) {
        if verbose_only {
            if self.verbose {
                log::debug!(target: "dnx", "{message}");
            }
        } else {
            log::info!(target: "dnx", "{message}");
        }
    }
}

//! Observation hook for failures the orchestrator is about to return.
//! Reporting never changes control flow; the caller still gets the error.

use std::error::Error;
use tracing::error;

pub trait ErrorReporter: Send + Sync {
    fn report(&self, err: &(dyn Error + 'static));
}

/// Default reporter: one `error!` event per failure, with its source chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &(dyn Error + 'static)) {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        error!(error = %err, causes = ?chain, "storage operation failed");
    }
}

use crate::error::TicketError;

/// Observability hook invoked on every error the client is about to raise.
/// The error itself is always re-raised to the caller; reporting is a side
/// channel only.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &TicketError);
}

/// Default reporter. Writes through the `log` facade so the consumer decides
/// the backend.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &TicketError) {
        match error {
            TicketError::RemoteRejected {
                status,
                message,
                suggestion,
            } => {
                log::error!(target: "ticketstub::client", "Error: {} - {}", status, message);
                if let Some(suggestion) = suggestion {
                    log::error!(target: "ticketstub::client", "Suggestion: {}", suggestion);
                }
            }
            TicketError::TransportUnavailable { url, .. } => {
                log::error!(
                    target: "ticketstub::client",
                    "Error: No response received from the server at {}.",
                    url
                );
            }
            other => log::error!(target: "ticketstub::client", "Error: {}", other),
        }
    }
}

/// Reporter for callers that run their own telemetry.
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &TicketError) {}
}

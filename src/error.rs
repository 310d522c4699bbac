use reqwest::StatusCode;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum TicketError {
    #[snafu(display("No response received from the ticket service at {}: {}", url, source))]
    TransportUnavailable { url: String, source: reqwest::Error },
    #[snafu(display("Ticket service rejected the request. Status: {}, Message: {}", status, message))]
    RemoteRejected {
        status: StatusCode,
        message: String,
        suggestion: Option<String>,
    },
    #[snafu(display("{}", message))]
    LocalFault { message: String },
    #[snafu(display("Could not encode token '{}' into a scannable code: {}", token, message))]
    EncodingFailure { token: String, message: String },
    #[snafu(display("Could not durably write artifact to {}: {}", path.display(), message))]
    SinkFailure { path: PathBuf, message: String },
    #[snafu(display("Could not fetch ticket {}: {}", id, source))]
    Upstream {
        id: String,
        #[snafu(source(from(TicketError, Box::new)))]
        source: Box<TicketError>,
    },
}

impl TicketError {
    /// Status code the remote responded with, if this failure came from the
    /// remote (directly or wrapped by the renderer).
    pub fn remote_status(&self) -> Option<StatusCode> {
        match self {
            TicketError::RemoteRejected { status, .. } => Some(*status),
            TicketError::Upstream { source, .. } => source.remote_status(),
            _ => None,
        }
    }
}

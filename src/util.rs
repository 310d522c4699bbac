use crate::error::{LocalFault, RemoteRejected, TransportUnavailable};
use crate::models::ErrorBody;
use crate::result::TicketResult;
use serde::de::DeserializeOwned;
use snafu::ResultExt;

pub(crate) trait HttpResponseExt {
    fn json_or_error<T: DeserializeOwned>(self, url: &str) -> TicketResult<T>;
}

impl HttpResponseExt for reqwest::blocking::Response {
    fn json_or_error<T: DeserializeOwned>(self, url: &str) -> TicketResult<T> {
        let status = self.status();
        let body = self.text().context(TransportUnavailable { url })?;

        if !status.is_success() {
            let envelope: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return RemoteRejected {
                status,
                message: envelope.message_or(&body),
                suggestion: envelope.suggestion.clone(),
            }
            .fail();
        }

        serde_json::from_str(&body).or_else(|source| {
            LocalFault {
                message: format!("Could not deserialize response body: {}, Error: {}", body, source),
            }
            .fail()
        })
    }
}

use crate::error::{LocalFault, TransportUnavailable};
use crate::models::{Confirmation, Ticket, TicketCheck, TicketDraft};
use crate::reporter::{ErrorReporter, LogReporter};
use crate::result::TicketResult;
use crate::util::HttpResponseExt;
use log::debug;
use reqwest::blocking::RequestBuilder;
use reqwest::header::HeaderName;
use snafu::ResultExt;
use url::Url;

/// Operations against the remote ticket service. `HttpTicketClient` is the
/// production implementation; tests substitute their own.
pub trait TicketApi {
    fn create(&self, draft: &TicketDraft) -> TicketResult<Ticket>;
    fn get(&self, id: &str) -> TicketResult<Ticket>;
    fn update(&self, id: &str, draft: &TicketDraft) -> TicketResult<Ticket>;
    fn delete(&self, id: &str) -> TicketResult<Confirmation>;
    fn check(&self, id: &str) -> TicketResult<TicketCheck>;
}

/// How the caller-supplied credential is attached to every request. One
/// scheme per client, chosen at construction.
pub enum Credential {
    /// Sent as an `x-api-key` header.
    ApiKey(String),
    /// Sent as an `Authorization: Bearer` header.
    Bearer(String),
}

impl Credential {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credential::ApiKey(key) => request.header(HeaderName::from_static("x-api-key"), key.as_str()),
            Credential::Bearer(token) => request.bearer_auth(token),
        }
    }
}

pub struct HttpTicketClient {
    base_url: Url,
    credential: Credential,
    reporter: Box<dyn ErrorReporter>,
}

impl HttpTicketClient {
    /// Creates a client for the ticket service at `base_url`. The credential
    /// is attached to every request; no other state is kept.
    pub fn new(base_url: &str, credential: Credential) -> TicketResult<HttpTicketClient> {
        let mut base_url = Url::parse(base_url).or_else(|source| {
            LocalFault {
                message: format!("Invalid base address '{}': {}", base_url, source),
            }
            .fail()
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(HttpTicketClient {
            base_url,
            credential,
            reporter: Box::new(LogReporter),
        })
    }

    /// Replaces the error reporting hook. Errors are still re-raised to the
    /// caller; only the side channel changes.
    pub fn with_reporter(mut self, reporter: Box<dyn ErrorReporter>) -> HttpTicketClient {
        self.reporter = reporter;
        self
    }

    fn resource_url(&self, path: &str) -> TicketResult<Url> {
        self.base_url.join(path).or_else(|source| {
            LocalFault {
                message: format!("Invalid resource path '{}': {}", path, source),
            }
            .fail()
        })
    }

    fn send(&self, request: RequestBuilder, url: &Url) -> TicketResult<reqwest::blocking::Response> {
        self.credential
            .apply(request)
            .send()
            .context(TransportUnavailable { url: url.as_str() })
    }

    fn reported<T>(&self, result: TicketResult<T>) -> TicketResult<T> {
        if let Err(error) = &result {
            self.reporter.report(error);
        }
        result
    }

    fn create_ticket(&self, draft: &TicketDraft) -> TicketResult<Ticket> {
        let url = self.resource_url("ticket")?;
        debug!(target: "ticketstub::client", "Creating ticket at {}", url);
        let client = reqwest::blocking::Client::new();
        let resp = self.send(client.post(url.as_str()).json(draft), &url)?;
        resp.json_or_error(url.as_str())
    }

    fn get_ticket(&self, id: &str) -> TicketResult<Ticket> {
        let id = require_id(id)?;
        let url = self.resource_url(&format!("ticket/{}", id))?;
        debug!(target: "ticketstub::client", "Retrieving ticket {} from {}", id, url);
        let client = reqwest::blocking::Client::new();
        let resp = self.send(client.get(url.as_str()), &url)?;
        resp.json_or_error(url.as_str())
    }

    fn update_ticket(&self, id: &str, draft: &TicketDraft) -> TicketResult<Ticket> {
        let id = require_id(id)?;
        let url = self.resource_url(&format!("ticket/{}", id))?;
        debug!(target: "ticketstub::client", "Updating ticket {} at {}", id, url);
        let client = reqwest::blocking::Client::new();
        let resp = self.send(client.put(url.as_str()).json(draft), &url)?;
        resp.json_or_error(url.as_str())
    }

    fn delete_ticket(&self, id: &str) -> TicketResult<Confirmation> {
        let id = require_id(id)?;
        let url = self.resource_url(&format!("ticket/{}", id))?;
        debug!(target: "ticketstub::client", "Deleting ticket {} at {}", id, url);
        let client = reqwest::blocking::Client::new();
        let resp = self.send(client.delete(url.as_str()), &url)?;
        resp.json_or_error(url.as_str())
    }

    fn check_ticket(&self, id: &str) -> TicketResult<TicketCheck> {
        let id = require_id(id)?;
        let url = self.resource_url(&format!("ticket/check/{}", id))?;
        debug!(target: "ticketstub::client", "Checking ticket {} at {}", id, url);
        let client = reqwest::blocking::Client::new();
        let resp = self.send(client.get(url.as_str()), &url)?;
        resp.json_or_error(url.as_str())
    }
}

impl TicketApi for HttpTicketClient {
    fn create(&self, draft: &TicketDraft) -> TicketResult<Ticket> {
        self.reported(self.create_ticket(draft))
    }

    fn get(&self, id: &str) -> TicketResult<Ticket> {
        self.reported(self.get_ticket(id))
    }

    fn update(&self, id: &str, draft: &TicketDraft) -> TicketResult<Ticket> {
        self.reported(self.update_ticket(id, draft))
    }

    fn delete(&self, id: &str) -> TicketResult<Confirmation> {
        self.reported(self.delete_ticket(id))
    }

    fn check(&self, id: &str) -> TicketResult<TicketCheck> {
        self.reported(self.check_ticket(id))
    }
}

fn require_id(id: &str) -> TicketResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return LocalFault {
            message: "Ticket identifier must not be empty".to_string(),
        }
        .fail();
    }
    Ok(id)
}

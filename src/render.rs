use crate::client::TicketApi;
use crate::error::Upstream;
use crate::models::{Ticket, DATETIME_FORMAT};
use crate::pdf::{DocumentSink, PdfFileSink};
use crate::qr::{CodeEncoder, QrCodeEncoder, ScannableCode};
use crate::result::TicketResult;
use chrono::NaiveDateTime;
use log::debug;
use snafu::ResultExt;
use std::path::PathBuf;

const TITLE_SIZE_PT: f64 = 20.0;
const FIELD_SIZE_PT: f64 = 16.0;
const WATERMARK_SIZE_PT: f64 = 12.0;
// 150pt square, the fixed bounding box for the scannable code.
const CODE_FIT_MM: (f64, f64) = (52.9, 52.9);
const WATERMARK_TEXT: &str = "Powered by ticketstub";
const DEFAULT_TOKEN_PREFIX: &str = "ticket_";

pub struct RenderOptions {
    pub include_watermark: bool,
    /// Where to write the artifact. When omitted a filesystem-safe name is
    /// derived from the ticket's event and holder fields; that derivation is
    /// best-effort and not collision-proof, so production callers should
    /// supply a path.
    pub output_path: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> RenderOptions {
        RenderOptions {
            include_watermark: true,
            output_path: None,
        }
    }
}

/// Renders one ticket into a printable PDF with an embedded scannable code.
/// Each render is one fetch, one encode, and one sink; failures from any
/// stage abort the whole render.
pub struct PdfRenderer {
    api: Box<dyn TicketApi + Send + Sync>,
    encoder: Box<dyn CodeEncoder + Send + Sync>,
    token_prefix: String,
}

impl PdfRenderer {
    pub fn new(api: Box<dyn TicketApi + Send + Sync>) -> PdfRenderer {
        PdfRenderer {
            api,
            encoder: Box::new(QrCodeEncoder::new()),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
        }
    }

    pub fn with_encoder(mut self, encoder: Box<dyn CodeEncoder + Send + Sync>) -> PdfRenderer {
        self.encoder = encoder;
        self
    }

    /// Literal prefixed to the ticket identifier inside the code, so ticket
    /// payloads stay distinguishable from other codes on a shared scanner.
    pub fn with_token_prefix(mut self, prefix: &str) -> PdfRenderer {
        self.token_prefix = prefix.to_string();
        self
    }

    /// Fetches the ticket, encodes its identity token and writes the
    /// artifact. The returned path is produced only after the sink reports
    /// durable completion.
    pub fn render(&self, id: &str, options: &RenderOptions) -> TicketResult<PathBuf> {
        let ticket = self.api.get(id).context(Upstream { id })?;

        let token = format!("{}{}", self.token_prefix, id);
        let code = self.encoder.encode(&token)?;

        let path = match &options.output_path {
            Some(path) => path.clone(),
            None => derived_artifact_path(&ticket),
        };
        debug!(target: "ticketstub::render", "Rendering ticket {} to {}", id, path.display());

        let mut sink = PdfFileSink::create(&path)?;
        self.write_artifact(&ticket, &code, options.include_watermark, &mut sink)?;
        Ok(path)
    }

    /// Emits the block sequence and finalizes the sink. Block order is part
    /// of the output contract: title, code, labeled fields, watermark.
    fn write_artifact(
        &self,
        ticket: &Ticket,
        code: &ScannableCode,
        include_watermark: bool,
        sink: &mut dyn DocumentSink,
    ) -> TicketResult<()> {
        sink.text_block(&format!("Ticket for {}", ticket.event_name), TITLE_SIZE_PT)?;
        sink.image_block(code, CODE_FIT_MM)?;

        // Every label is emitted even when the ticket omits the value.
        let fields = [
            ("Event Name", ticket.event_name.clone()),
            ("Event Location", ticket.event_location.clone()),
            ("Event Date", display_date(&ticket.event_date)),
            ("Holder Name", ticket.holder_name.clone()),
            ("Holder Email", ticket.holder_email.clone()),
            ("Notes", ticket.notes.clone().unwrap_or_default()),
            (
                "Terms and Conditions",
                ticket.terms_and_conditions.clone().unwrap_or_default(),
            ),
        ];
        for (label, value) in &fields {
            sink.text_block(&format!("{}: {}", label, value), FIELD_SIZE_PT)?;
        }

        if include_watermark {
            sink.text_block(WATERMARK_TEXT, WATERMARK_SIZE_PT)?;
        }
        sink.finish()
    }
}

fn display_date(date: &Option<NaiveDateTime>) -> String {
    match date {
        Some(date) => date.format(DATETIME_FORMAT).to_string(),
        None => String::new(),
    }
}

/// Fallback artifact name derived from free-text ticket fields, lower-cased
/// with all whitespace stripped. Distinct tickets with identical event and
/// holder text collide.
pub(crate) fn derived_artifact_path(ticket: &Ticket) -> PathBuf {
    let name = format!(
        "ticket_{}_{}.pdf",
        ticket.event_name, ticket.holder_name
    );
    let name: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    PathBuf::from(name)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::{RemoteRejected, TicketError};
    use crate::models::{Confirmation, TicketCheck, TicketDraft};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn fixture_ticket() -> Ticket {
        Ticket {
            id: "tkt_9f8e7d".to_string(),
            event_name: "Expo 2024".to_string(),
            event_location: "Hall 7".to_string(),
            event_date: NaiveDateTime::parse_from_str("2024-09-14 18:30:00", DATETIME_FORMAT).ok(),
            holder_name: "Ada Lovelace".to_string(),
            holder_email: "ada@example.com".to_string(),
            expires_at: None,
            notes: None,
            terms_and_conditions: None,
        }
    }

    struct StubApi {
        ticket: Option<Ticket>,
        get_calls: Arc<AtomicUsize>,
    }

    impl StubApi {
        fn returning(ticket: Ticket) -> StubApi {
            StubApi {
                ticket: Some(ticket),
                get_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn not_found() -> StubApi {
            StubApi {
                ticket: None,
                get_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl TicketApi for StubApi {
        fn create(&self, _draft: &TicketDraft) -> TicketResult<Ticket> {
            unimplemented!()
        }

        fn get(&self, _id: &str) -> TicketResult<Ticket> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            match &self.ticket {
                Some(ticket) => Ok(ticket.clone()),
                None => RemoteRejected {
                    status: StatusCode::NOT_FOUND,
                    message: "No ticket with that identifier exists.".to_string(),
                    suggestion: None::<String>,
                }
                .fail(),
            }
        }

        fn update(&self, _id: &str, _draft: &TicketDraft) -> TicketResult<Ticket> {
            unimplemented!()
        }

        fn delete(&self, _id: &str) -> TicketResult<Confirmation> {
            unimplemented!()
        }

        fn check(&self, _id: &str) -> TicketResult<TicketCheck> {
            unimplemented!()
        }
    }

    struct CountingEncoder {
        inner: QrCodeEncoder,
        calls: Arc<AtomicUsize>,
        last_token: Arc<Mutex<Option<String>>>,
    }

    impl CountingEncoder {
        fn new() -> CountingEncoder {
            CountingEncoder {
                inner: QrCodeEncoder::new(),
                calls: Arc::new(AtomicUsize::new(0)),
                last_token: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl CodeEncoder for CountingEncoder {
        fn encode(&self, token: &str) -> TicketResult<ScannableCode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_token.lock().unwrap() = Some(token.to_string());
            self.inner.encode(token)
        }
    }

    #[derive(Debug, PartialEq)]
    enum Block {
        Text(String, i64),
        Image(String),
        Finished,
    }

    #[derive(Default)]
    struct RecordingSink {
        blocks: Vec<Block>,
        fail_on_finish: bool,
    }

    impl DocumentSink for RecordingSink {
        fn text_block(&mut self, text: &str, size_pt: f64) -> TicketResult<()> {
            self.blocks.push(Block::Text(text.to_string(), size_pt as i64));
            Ok(())
        }

        fn image_block(&mut self, code: &ScannableCode, _fit_mm: (f64, f64)) -> TicketResult<()> {
            self.blocks.push(Block::Image(code.token().to_string()));
            Ok(())
        }

        fn finish(&mut self) -> TicketResult<()> {
            if self.fail_on_finish {
                return Err(TicketError::SinkFailure {
                    path: PathBuf::from("artifact.pdf"),
                    message: "stream aborted before completion".to_string(),
                });
            }
            self.blocks.push(Block::Finished);
            Ok(())
        }
    }

    fn renderer(api: StubApi) -> PdfRenderer {
        PdfRenderer::new(Box::new(api))
    }

    #[test]
    fn blocks_are_emitted_in_contract_order() {
        let renderer = renderer(StubApi::returning(fixture_ticket()));
        let code = QrCodeEncoder::new().encode("ticket_tkt_9f8e7d").unwrap();
        let mut sink = RecordingSink::default();

        renderer
            .write_artifact(&fixture_ticket(), &code, true, &mut sink)
            .unwrap();

        let blocks = sink.blocks;
        assert_eq!(blocks[0], Block::Text("Ticket for Expo 2024".to_string(), 20));
        assert_eq!(blocks[1], Block::Image("ticket_tkt_9f8e7d".to_string()));
        assert_eq!(blocks[2], Block::Text("Event Name: Expo 2024".to_string(), 16));
        assert_eq!(blocks[3], Block::Text("Event Location: Hall 7".to_string(), 16));
        assert_eq!(
            blocks[4],
            Block::Text("Event Date: 2024-09-14 18:30:00".to_string(), 16)
        );
        assert_eq!(blocks[5], Block::Text("Holder Name: Ada Lovelace".to_string(), 16));
        assert_eq!(
            blocks[6],
            Block::Text("Holder Email: ada@example.com".to_string(), 16)
        );
        assert_eq!(blocks[7], Block::Text("Notes: ".to_string(), 16));
        assert_eq!(blocks[8], Block::Text("Terms and Conditions: ".to_string(), 16));
        assert_eq!(blocks[9], Block::Text("Powered by ticketstub".to_string(), 12));
        assert_eq!(blocks[10], Block::Finished);
    }

    #[test]
    fn missing_optional_fields_keep_their_labels() {
        let renderer = renderer(StubApi::returning(fixture_ticket()));
        let mut ticket = fixture_ticket();
        ticket.event_location = String::new();
        ticket.event_date = None;
        let code = QrCodeEncoder::new().encode("ticket_tkt_9f8e7d").unwrap();
        let mut sink = RecordingSink::default();

        renderer
            .write_artifact(&ticket, &code, false, &mut sink)
            .unwrap();

        let blocks = sink.blocks;
        assert!(blocks.contains(&Block::Text("Event Location: ".to_string(), 16)));
        assert!(blocks.contains(&Block::Text("Event Date: ".to_string(), 16)));
        assert!(!blocks
            .iter()
            .any(|b| *b == Block::Text("Powered by ticketstub".to_string(), 12)));
    }

    #[test]
    fn sink_abort_before_completion_discards_the_result() {
        let renderer = renderer(StubApi::returning(fixture_ticket()));
        let code = QrCodeEncoder::new().encode("ticket_tkt_9f8e7d").unwrap();
        let mut sink = RecordingSink {
            fail_on_finish: true,
            ..Default::default()
        };

        match renderer.write_artifact(&fixture_ticket(), &code, true, &mut sink) {
            Err(TicketError::SinkFailure { message, .. }) => {
                assert!(message.contains("aborted"))
            }
            other => panic!("Expected SinkFailure, got {:?}", other),
        }
    }

    #[test]
    fn client_failures_are_wrapped_as_upstream() {
        let renderer = renderer(StubApi::not_found());

        match renderer.render("tkt_missing", &RenderOptions::default()) {
            Err(TicketError::Upstream { id, source }) => {
                assert_eq!(id, "tkt_missing");
                assert_eq!(source.remote_status(), Some(StatusCode::NOT_FOUND));
            }
            other => panic!("Expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn derived_filename_is_lowercase_without_whitespace() {
        let path = derived_artifact_path(&fixture_ticket());
        assert_eq!(path, PathBuf::from("ticket_expo2024_adalovelace.pdf"));
    }

    #[test]
    fn renders_with_one_fetch_and_one_encode() {
        let api = StubApi::returning(fixture_ticket());
        let get_calls = api.get_calls.clone();
        let encoder = CountingEncoder::new();
        let encode_calls = encoder.calls.clone();
        let renderer = PdfRenderer::new(Box::new(api)).with_encoder(Box::new(encoder));

        let dir = tempfile::tempdir().unwrap();
        let options = RenderOptions {
            include_watermark: true,
            output_path: Some(dir.path().join("expo.pdf")),
        };
        let path = renderer.render("tkt_9f8e7d", &options).unwrap();

        assert_eq!(path, dir.path().join("expo.pdf"));
        assert_eq!(get_calls.load(Ordering::SeqCst), 1);
        assert_eq!(encode_calls.load(Ordering::SeqCst), 1);
    }

    // There is no decode-the-raster assertion here: a QR decoder dev-dependency
    // would pin a conflicting `image` major, so scan-back fidelity rests on the
    // encoder determinism test plus the token checks below.
    #[test]
    fn token_carries_the_configured_prefix() {
        let api = StubApi::returning(fixture_ticket());
        let encoder = CountingEncoder::new();
        let last_token = encoder.last_token.clone();
        let renderer = PdfRenderer::new(Box::new(api))
            .with_encoder(Box::new(encoder))
            .with_token_prefix("gate_");

        let dir = tempfile::tempdir().unwrap();
        let options = RenderOptions {
            include_watermark: false,
            output_path: Some(dir.path().join("expo.pdf")),
        };
        renderer.render("tkt_9f8e7d", &options).unwrap();

        assert_eq!(
            last_token.lock().unwrap().as_deref(),
            Some("gate_tkt_9f8e7d")
        );
    }
}

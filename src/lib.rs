#![cfg_attr(not(debug_assertions), deny(unused_variables))]
#![cfg_attr(not(debug_assertions), deny(unused_imports))]
#![cfg_attr(not(debug_assertions), deny(dead_code))]
// Unused results is more often than not an error
#![deny(unused_must_use)]
#![cfg_attr(not(debug_assertions), deny(unused_extern_crates))]

mod client;
mod error;
mod models;
mod pdf;
mod qr;
mod render;
mod reporter;
mod result;
mod util;

pub use client::{Credential, HttpTicketClient, TicketApi};
pub use error::TicketError;
pub use models::{Confirmation, Ticket, TicketCheck, TicketDraft, DATETIME_FORMAT};
pub use pdf::{DocumentSink, PdfFileSink};
pub use qr::{CodeEncoder, QrCodeEncoder, ScannableCode};
pub use render::{PdfRenderer, RenderOptions};
pub use reporter::{ErrorReporter, LogReporter, NoopReporter};
pub use result::TicketResult;

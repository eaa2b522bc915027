//! Spreadsheet exporter backed by a Google Apps Script web app.
//!
//! The web app accepts form posts carrying an `action` and a JSON `data`
//! field and rewrites (or appends to) a single sheet. Its replies are often
//! unreadable redirect pages, so a push that goes through without a JSON
//! confirmation is reported as uncertain rather than failed.

mod exporter;
mod payload;

pub mod error;

pub use error::{Error, Result};
pub use exporter::SheetsExporter;
pub use payload::{Action, SheetRow};

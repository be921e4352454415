//! # Certificate Pipeline
//!
//! The bulk rendering core behind the download step of the wizard. It is made of three
//! pieces that only ever exchange plain data:
//!
//! - `extract`: reads the ordered recipient names out of an uploaded spreadsheet.
//! - `render`: rasterizes one certificate (template background plus the centred name)
//!   on a fixed A4-landscape canvas and encodes it as PNG.
//! - `archive`: drives the renderer over every recipient, packs the images into a ZIP
//!   archive in recipient order and reports progress after each completed certificate.
//!
//! Nothing in here touches the session store or the network. Callers hand in a
//! `CertificateSettings` snapshot and spreadsheet bytes and receive bytes back.

pub mod archive;
pub mod error;
pub mod extract;
pub mod fonts;
pub mod render;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;

pub use archive::{progress_percent, BatchArchiver, BatchOptions, CancellationFlag};
pub use error::CertificateError;
pub use extract::{extract, extract_with_format, SpreadsheetFormat};
pub use render::CertificateRenderer;
pub use settings::CertificateSettings;

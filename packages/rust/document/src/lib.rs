//! Evidence document production: page fetching, HTML assembly, and
//! HTML-to-PDF conversion behind collaborator traits.
//!
//! - [`render`] — the [`DocumentRenderer`], [`DocumentAuthoring`], and
//!   [`FileStorage`] collaborator seams and their default implementations
//! - [`convert`] — the single-page [`PageConverter`]
//! - [`evidence`] — the multi-question Evidence Document Builder

pub mod convert;
pub mod evidence;
pub mod render;

pub use convert::{ConversionStrategy, PageConverter};
pub use evidence::{EVIDENCE_DOCUMENT_NAME, build_evidence_document, build_evidence_html};
pub use render::{
    DocumentAuthoring, DocumentRenderer, FileStorage, HttpAuthoring, HttpRenderer,
    LocalFileStorage,
};

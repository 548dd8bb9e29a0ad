//! Evidence Document Builder: folds Stack Overflow search items into one
//! multi-section HTML document and renders it to a single PDF blob.

use reqwest::Client;
use tracing::{info, instrument};

use scriptwright_shared::{EvidenceDocument, Result, ScriptwrightError, SearchItem};

use crate::render::DocumentRenderer;

/// Display name of the rendered search-evidence blob.
pub const EVIDENCE_DOCUMENT_NAME: &str = "stackoverflow-evidence.pdf";

/// Assemble one HTML document from search items, one section per item.
///
/// Each section (1-indexed) carries a "Question i" heading, a linked title
/// heading, the question body, a "Solved answer to question i" heading, and
/// the accepted answer's body. The stylesheet forces a page break before
/// every `<h1>`, so each question starts on a new page in paged output.
///
/// Fails with [`ScriptwrightError::MissingAcceptedAnswer`] if any item has
/// no answer marked accepted.
pub fn build_evidence_html(items: &[SearchItem]) -> Result<String> {
    let mut sections = String::new();

    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        let answer = item
            .accepted_answer()
            .ok_or_else(|| ScriptwrightError::MissingAcceptedAnswer {
                title: item.title.clone(),
            })?;

        sections.push_str(&format!(
            concat!(
                "<h1>Question {n}</h1>",
                r#"<h2>Title: <a href="{link}">{title}</a></h2>"#,
                "{body}",
                "<h2>Solved answer to question {n}</h2>",
                "{answer}",
            ),
            n = n,
            link = item.link,
            title = item.title,
            body = item.body,
            answer = answer.body,
        ));
    }

    Ok(format!(
        concat!(
            "<!DOCTYPE html><html><head>",
            r#"<base target="_top">"#,
            "<style>h1 {{ page-break-before: always; }}</style>",
            "</head><body>{}</body></html>",
        ),
        sections
    ))
}

/// Build the evidence document: assemble HTML from `items`, inline all
/// images, and render to a single PDF blob.
#[instrument(skip_all, fields(items = items.len()))]
pub async fn build_evidence_document(
    client: &Client,
    renderer: &dyn DocumentRenderer,
    items: &[SearchItem],
) -> Result<EvidenceDocument> {
    let html = build_evidence_html(items)?;
    let html = scriptwright_inline::inline_images(client, &html).await;
    let pdf = renderer.html_to_pdf(&html).await?;

    info!(pdf_bytes = pdf.len(), "evidence document built");
    Ok(EvidenceDocument::new(EVIDENCE_DOCUMENT_NAME, pdf))
}

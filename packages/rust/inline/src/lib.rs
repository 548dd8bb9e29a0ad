//! Remote-image inlining for HTML documents.
//!
//! Rewrites every `<img>` tag whose `src` is an absolute http(s) URL into a
//! self-contained base64 `data:` URI, so the resulting document has no
//! external image dependencies. A secondary pass handles Medium's
//! `<picture>` responsive-image containers.
//!
//! The markup is treated as text (regex scanning, not a DOM parse) by
//! design; this module is the narrow interface behind which a structured
//! implementation could be substituted.

use std::ops::Range;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument};

/// Fixed display width applied to rewritten standard image tags.
const INLINE_IMAGE_WIDTH: &str = "1000";

static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<img.*?>").expect("valid img tag regex"));

static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src=["'](http.*?)["']"#).expect("valid src regex"));

static PICTURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<picture>.*?</picture>").expect("valid picture regex"));

static SRCSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)srcset=["'](http.*?)["']"#).expect("valid srcset regex"));

// ---------------------------------------------------------------------------
// Best-effort image fetching
// ---------------------------------------------------------------------------

/// Why an image reference was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The server answered with a non-success status.
    Status(u16),
    /// The request never produced a response (connect, timeout, body read).
    Transport(String),
}

/// A successfully fetched image, ready for data-URI encoding.
#[derive(Debug)]
struct FetchedImage {
    bytes: Vec<u8>,
    content_type: String,
}

/// Fetch one image URL. Failures are skips, never fatal: the caller keeps
/// the original tag text untouched.
async fn fetch_image(client: &Client, url: &str) -> Result<FetchedImage, SkipReason> {
    let response = client
        .get(url.trim())
        .send()
        .await
        .map_err(|e| SkipReason::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SkipReason::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SkipReason::Transport(e.to_string()))?;

    Ok(FetchedImage {
        bytes: bytes.to_vec(),
        content_type,
    })
}

fn data_uri(image: &FetchedImage) -> String {
    format!(
        "data:{};base64,{}",
        image.content_type,
        BASE64.encode(&image.bytes)
    )
}

// ---------------------------------------------------------------------------
// Span rewriting
// ---------------------------------------------------------------------------

/// Rebuild `html`, replacing each matched span whose image fetch succeeded.
/// Substitution is keyed by the span itself, never by URL or tag text, so
/// duplicate tags cannot corrupt unrelated occurrences.
async fn rewrite_spans<F>(
    client: &Client,
    html: &str,
    targets: Vec<(Range<usize>, String)>,
    make_tag: F,
) -> String
where
    F: Fn(&str) -> String,
{
    if targets.is_empty() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    for (span, url) in targets {
        out.push_str(&html[cursor..span.start]);

        match fetch_image(client, &url).await {
            Ok(image) => {
                debug!(url = %url, bytes = image.bytes.len(), "image inlined");
                out.push_str(&make_tag(&data_uri(&image)));
            }
            Err(reason) => {
                // Silent skip: the tag stays byte-for-byte as it was.
                debug!(url = %url, ?reason, "image fetch skipped");
                out.push_str(&html[span.clone()]);
            }
        }

        cursor = span.end;
    }

    out.push_str(&html[cursor..]);
    out
}

// ---------------------------------------------------------------------------
// Public passes
// ---------------------------------------------------------------------------

/// Inline every `<img>` tag referencing an absolute http(s) URL.
///
/// Tags whose `src` is relative, already a `data:` URI, or unreachable
/// (non-2xx) are left untouched. Each rewritten tag becomes
/// `<img src="data:..." width="1000">`.
#[instrument(skip_all, fields(len = html.len()))]
pub async fn inline_images(client: &Client, html: &str) -> String {
    let targets: Vec<(Range<usize>, String)> = IMG_TAG_RE
        .find_iter(html)
        .filter_map(|m| {
            IMG_SRC_RE
                .captures(m.as_str())
                .map(|c| (m.range(), c[1].to_string()))
        })
        .collect();

    rewrite_spans(client, html, targets, |uri| {
        format!(r#"<img src="{uri}" width="{INLINE_IMAGE_WIDTH}">"#)
    })
    .await
}

/// Secondary pass for Medium article markup: each `<picture>` container is
/// collapsed to a plain `<img>` whose source is the first candidate URL of
/// the container's `srcset` attribute, inlined as a data URI.
#[instrument(skip_all, fields(len = html.len()))]
pub async fn inline_medium_pictures(client: &Client, html: &str) -> String {
    let targets: Vec<(Range<usize>, String)> = PICTURE_RE
        .find_iter(html)
        .filter_map(|m| {
            SRCSET_RE.captures(m.as_str()).and_then(|c| {
                // srcset lists "url descriptor, url descriptor, ..."; take
                // the first candidate URL.
                c[1].split_whitespace()
                    .next()
                    .map(|first| (m.range(), first.to_string()))
            })
        })
        .collect();

    rewrite_spans(client, html, targets, |uri| {
        format!(r#"<img src="{uri}">"#)
    })
    .await
}

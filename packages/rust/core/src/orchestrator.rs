//! The top-level run coordinator.
//!
//! A run walks a fixed stage sequence:
//! GatherSources → SearchEvidence → Generate, with two early terminals
//! inside the search stage (raw items, or the storage URL of an exported
//! evidence document). Every branch is an explicit [`RunOutcome`]; a failure
//! in any stage aborts the whole run with no partial result.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use scriptwright_document::{
    ConversionStrategy, DocumentAuthoring, DocumentRenderer, FileStorage, PageConverter,
    build_evidence_document,
};
use scriptwright_gemini::{GeminiClient, GenerationSchema};
use scriptwright_search::SearchClient;
use scriptwright_shared::{
    EvidenceDocument, GenerationResult, Result, ScriptwrightError, SearchItem,
};

/// Page size requested from the search API (its maximum).
const SEARCH_PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Evidence-search settings for one run.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Free-text query.
    pub query: String,
    /// Tags the questions must carry.
    pub tags: Vec<String>,
    /// How many top-ranked items go into the evidence document.
    pub number_of_questions: usize,
    /// Terminal mode: return raw items (or, with `export_pdf`, the storage URL).
    pub only_search_questions: bool,
    /// Persist the evidence document to storage.
    pub export_pdf: bool,
}

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The natural-language task description.
    pub prompt: String,
    /// Other-site evidence pages, converted in this order.
    pub other_urls: Vec<Url>,
    /// Stack Overflow evidence search, when active.
    pub search: Option<SearchSettings>,
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The schema-constrained generation result.
    Generated(GenerationResult),
    /// Raw (untruncated) search items; generation was skipped.
    SearchItems(Vec<SearchItem>),
    /// Storage URL of the exported evidence document; generation was skipped.
    ExportedEvidence(String),
}

// ---------------------------------------------------------------------------
// Stage machine
// ---------------------------------------------------------------------------

/// Non-terminal stages of a run. Terminals surface as [`RunOutcome`].
enum Stage {
    GatherSources,
    SearchEvidence(Vec<EvidenceDocument>),
    Generate(Vec<EvidenceDocument>),
}

/// Top-level coordinator wiring all collaborators together for one run.
pub struct Orchestrator<'a> {
    http: Client,
    renderer: &'a dyn DocumentRenderer,
    authoring: Option<&'a dyn DocumentAuthoring>,
    storage: Option<&'a dyn FileStorage>,
    search: Option<&'a SearchClient>,
    gemini: &'a GeminiClient,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        renderer: &'a dyn DocumentRenderer,
        authoring: Option<&'a dyn DocumentAuthoring>,
        storage: Option<&'a dyn FileStorage>,
        search: Option<&'a SearchClient>,
        gemini: &'a GeminiClient,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScriptwrightError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            renderer,
            authoring,
            storage,
            search,
            gemini,
        })
    }

    /// Execute one run to its terminal outcome.
    #[instrument(skip_all, fields(other_urls = config.other_urls.len(), search = config.search.is_some()))]
    pub async fn run(&self, config: &RunConfig) -> Result<RunOutcome> {
        let mut stage = Stage::GatherSources;

        loop {
            stage = match stage {
                Stage::GatherSources => {
                    let documents = self.gather_other_sources(config).await?;
                    Stage::SearchEvidence(documents)
                }
                Stage::SearchEvidence(documents) => match self.search_evidence(config, documents).await? {
                    SearchStageExit::Continue(documents) => Stage::Generate(documents),
                    SearchStageExit::Terminal(outcome) => return Ok(outcome),
                },
                Stage::Generate(documents) => {
                    return Ok(RunOutcome::Generated(self.generate(config, documents).await?));
                }
            };
        }
    }

    /// Stage 1: convert each other-source URL in input order.
    async fn gather_other_sources(&self, config: &RunConfig) -> Result<Vec<EvidenceDocument>> {
        if config.other_urls.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            urls = config.other_urls.len(),
            "retrieving related information from other sites"
        );
        let converter = PageConverter::new(self.renderer, self.authoring)?;
        let mut documents = Vec::with_capacity(config.other_urls.len());

        for url in &config.other_urls {
            documents.push(converter.convert(url, ConversionStrategy::Direct).await?);
        }

        Ok(documents)
    }

    /// Stage 2: run the evidence search, honoring both early terminals.
    async fn search_evidence(
        &self,
        config: &RunConfig,
        mut documents: Vec<EvidenceDocument>,
    ) -> Result<SearchStageExit> {
        let Some(settings) = &config.search else {
            return Ok(SearchStageExit::Continue(documents));
        };

        let search = self.search.ok_or_else(|| {
            ScriptwrightError::config("evidence search configured but no search client provided")
        })?;

        info!("searching related questions and answers from Stack Overflow");
        let mut items = search
            .search(&settings.query, &settings.tags, SEARCH_PAGE_SIZE)
            .await?;
        info!(count = items.len(), "questions retrieved for script generation");

        if settings.only_search_questions && !settings.export_pdf {
            return Ok(SearchStageExit::Terminal(RunOutcome::SearchItems(items)));
        }

        // Items beyond the cutoff are discarded for good.
        items.truncate(settings.number_of_questions);
        let document = build_evidence_document(&self.http, self.renderer, &items).await?;

        if settings.export_pdf {
            let storage = self.storage.ok_or_else(|| {
                ScriptwrightError::config("export_pdf set but no file storage provided")
            })?;
            info!("exporting the searched questions and answers as a PDF file");
            let stored = storage.persist(&document).await?;
            if settings.only_search_questions {
                return Ok(SearchStageExit::Terminal(RunOutcome::ExportedEvidence(
                    stored.url,
                )));
            }
        }

        documents.push(document);
        Ok(SearchStageExit::Continue(documents))
    }

    /// Stages 3–5: assemble the prompt, upload attachments, invoke Gemini.
    async fn generate(
        &self,
        config: &RunConfig,
        documents: Vec<EvidenceDocument>,
    ) -> Result<GenerationResult> {
        let (prompt, files) = if documents.is_empty() {
            info!("generating script from the prompt alone");
            (config.prompt.clone(), Vec::new())
        } else {
            info!(
                documents = documents.len(),
                "generating script using the referenced questions and answers"
            );
            let files = self.gemini.upload_files(&documents).await?;
            (wrap_prompt(&config.prompt), files)
        };

        let schema = GenerationSchema::new(prompt);
        self.gemini.generate(&schema, &files).await
    }
}

/// Exit of the search stage: continue with the document collection, or stop
/// at one of the two early terminals.
enum SearchStageExit {
    Continue(Vec<EvidenceDocument>),
    Terminal(RunOutcome),
}

/// The fixed instruction wrapping the original task prompt when evidence
/// documents are attached.
pub fn wrap_prompt(prompt: &str) -> String {
    format!(
        "<MainQuestion>{prompt}</MainQuestion>\n\
         First, understand the questions and answers in the attached PDF documents.\n\
         Next, generate a more efficient script for \"MainQuestion\" by referencing \
         those questions and answers."
    )
}

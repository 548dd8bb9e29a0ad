//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use scriptwright_core::{Orchestrator, RunConfig, RunOutcome, SearchSettings};
use scriptwright_document::{FileStorage, HttpRenderer, LocalFileStorage};
use scriptwright_gemini::GeminiClient;
use scriptwright_search::{Credentials, SearchClient};
use scriptwright_shared::{
    AppConfig, StackOverflowConfig, env_credential, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Scriptwright — generate scripts backed by web and Stack Overflow evidence.
#[derive(Parser)]
#[command(
    name = "scriptwright",
    version,
    about = "Generate scripts with Gemini, grounded in Stack Overflow answers and web pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to an alternate config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline: gather evidence, then generate a script.
    Generate {
        /// The task prompt.
        #[arg(long, conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the task prompt from a file.
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Other-site evidence URL (repeatable, converted in order).
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Gemini model override.
        #[arg(long)]
        model: Option<String>,

        /// Stack Overflow search query override.
        #[arg(long)]
        search_query: Option<String>,

        /// Stack Overflow tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// How many top-ranked questions go into the evidence document.
        #[arg(long)]
        questions: Option<usize>,

        /// Return the raw search results without generating a script.
        #[arg(long)]
        only_search: bool,

        /// Persist the evidence document and print its location.
        #[arg(long)]
        export_pdf: bool,

        /// Directory for exported evidence documents.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Search Stack Overflow and print the matching questions.
    Search {
        /// Free-text query.
        query: String,

        /// Tag the questions must carry (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "scriptwright=info",
        1 => "scriptwright=debug",
        _ => "scriptwright=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Generate {
            prompt,
            prompt_file,
            urls,
            model,
            search_query,
            tags,
            questions,
            only_search,
            export_pdf,
            out,
        } => {
            let prompt = resolve_prompt(prompt, prompt_file)?;
            let run_config = build_run_config(
                &config,
                prompt,
                urls,
                search_query,
                tags,
                questions,
                only_search,
                export_pdf,
            )?;
            generate(&config, model, run_config, out).await
        }
        Command::Search { query, tags } => search(&config, query, tags).await,
        Command::Config { action } => match action {
            ConfigAction::Init => {
                let path = init_config()?;
                println!("Created {}", path.display());
                Ok(())
            }
            ConfigAction::Show => {
                println!("{}", toml_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn toml_pretty(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| eyre!("failed to render config: {e}"))
}

fn resolve_prompt(prompt: Option<String>, prompt_file: Option<PathBuf>) -> Result<String> {
    match (prompt, prompt_file) {
        (Some(p), _) => Ok(p),
        (None, Some(path)) => Ok(std::fs::read_to_string(&path)
            .map_err(|e| eyre!("failed to read {}: {e}", path.display()))?
            .trim_end()
            .to_string()),
        (None, None) => Err(eyre!("provide a task with --prompt or --prompt-file")),
    }
}

/// Merge config-file settings with CLI overrides into one immutable RunConfig.
#[allow(clippy::too_many_arguments)]
fn build_run_config(
    config: &AppConfig,
    prompt: String,
    urls: Vec<String>,
    search_query: Option<String>,
    tags: Vec<String>,
    questions: Option<usize>,
    only_search: bool,
    export_pdf: bool,
) -> Result<RunConfig> {
    let mut other_urls: Vec<Url> = Vec::new();
    let configured = config
        .other_sources
        .as_ref()
        .map(|s| s.urls.clone())
        .unwrap_or_default();
    for raw in if urls.is_empty() { configured } else { urls } {
        other_urls.push(Url::parse(&raw).map_err(|e| eyre!("invalid URL {raw}: {e}"))?);
    }

    let base = config.stackoverflow.as_ref();
    let query = search_query.or_else(|| base.map(|s| s.search_query.clone()));

    let search = query.map(|query| SearchSettings {
        query,
        tags: if tags.is_empty() {
            base.map(|s| s.search_tags.clone()).unwrap_or_default()
        } else {
            tags
        },
        number_of_questions: questions
            .or_else(|| base.map(|s| s.number_of_questions))
            .unwrap_or(10),
        only_search_questions: only_search || base.is_some_and(|s| s.only_search_questions),
        export_pdf: export_pdf || base.is_some_and(|s| s.export_pdf),
    });

    Ok(RunConfig {
        prompt,
        other_urls,
        search,
    })
}

async fn generate(
    config: &AppConfig,
    model: Option<String>,
    run_config: RunConfig,
    out: PathBuf,
) -> Result<()> {
    let api_key = env_credential(&config.gemini.api_key_env)?;
    let model = model.unwrap_or_else(|| config.gemini.model.clone());

    let renderer = HttpRenderer::new(&config.renderer.endpoint)?;
    let gemini = GeminiClient::new(api_key, &model)?;

    let search_client = match &run_config.search {
        Some(_) => Some(search_client_from(config)?),
        None => None,
    };
    let storage = LocalFileStorage::new(out);
    let needs_storage = run_config.search.as_ref().is_some_and(|s| s.export_pdf);

    let orchestrator = Orchestrator::new(
        &renderer,
        None,
        needs_storage.then_some(&storage as &dyn FileStorage),
        search_client.as_ref(),
        &gemini,
    )?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").expect("spinner template"));
    spinner.set_message(format!("Generating with {model}..."));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let outcome = orchestrator.run(&run_config).await;
    spinner.finish_and_clear();

    match outcome? {
        RunOutcome::Generated(result) => {
            info!("generation complete");
            println!("{}", result.script);
            println!();
            println!("--- Description ---");
            println!("{}", result.description_of_script);
        }
        RunOutcome::SearchItems(items) => {
            print_items(&items)?;
        }
        RunOutcome::ExportedEvidence(url) => {
            println!("{url}");
        }
    }

    Ok(())
}

async fn search(config: &AppConfig, query: String, tags: Vec<String>) -> Result<()> {
    let client = search_client_from(config)?;
    let items = client.search(&query, &tags, 100).await?;
    print_items(&items)?;
    Ok(())
}

fn search_client_from(config: &AppConfig) -> Result<SearchClient> {
    let so: &StackOverflowConfig = config
        .stackoverflow
        .as_ref()
        .ok_or_else(|| eyre!("no [stackoverflow] section in config"))?;

    Ok(SearchClient::new(Credentials {
        access_token: env_credential(&so.access_token_env)?,
        key: env_credential(&so.key_env)?,
    })?)
}

fn print_items(items: &[scriptwright_shared::SearchItem]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(items)?);
    Ok(())
}

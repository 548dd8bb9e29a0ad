//! Scriptwright CLI — evidence-backed script generation.
//!
//! Gathers contextual evidence from web pages and Stack Overflow, renders it
//! into self-contained PDF documents, and asks Gemini for a script
//! constrained to a fixed JSON schema.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

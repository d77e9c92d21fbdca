//! ares CLI: offline, rule-based information-extraction engine.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ares::config::EngineConfig;
use ares::identity::IdentityStore;
use ares::parser::RuleBasedParser;
use ares::pipeline::{self, ExtractOptions};

#[derive(Parser)]
#[command(name = "ares", version, about = "Offline, rule-based information-extraction engine")]
struct Cli {
    /// Path to a persisted identity snapshot (EID/AID/SP registries) to
    /// load before extraction and save after, enabling cross-document
    /// identity resolution across separate invocations.
    #[arg(long, global = true)]
    identity_store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a text file and print the result as JSON.
    Extract {
        /// Path to the document to process.
        file: PathBuf,

        /// Document id recorded on every emitted relation's evidence.
        #[arg(long, default_value = "doc-1")]
        doc_id: String,

        /// Skip HERT generation (C15).
        #[arg(long)]
        no_hert: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env(&std::env::vars().collect::<HashMap<_, _>>()).into_diagnostic()?;

    match cli.command {
        Commands::Extract { file, doc_id, no_hert } => {
            let text = fs::read_to_string(&file).into_diagnostic()?;

            let identity = match &cli.identity_store {
                Some(path) if path.exists() => {
                    let bytes = fs::read(path).into_diagnostic()?;
                    let snapshot = bincode::deserialize(&bytes).into_diagnostic()?;
                    IdentityStore::restore(snapshot)
                }
                _ => IdentityStore::new(),
            };

            let parser = RuleBasedParser::new();
            let mut options = ExtractOptions::new(&parser, &identity);
            options.generate_herts = !no_hert;

            let result = pipeline::extract(&doc_id, &text, &config, &options).into_diagnostic()?;

            if let Some(path) = &cli.identity_store {
                let bytes = bincode::serialize(&identity.snapshot()).into_diagnostic()?;
                fs::write(path, bytes).into_diagnostic()?;
            }

            let json = serde_json::to_string_pretty(&result).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}

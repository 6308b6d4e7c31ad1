//! pdf-highlight binary
//!
//! Finds key phrases in a PDF and writes a copy with them highlighted.

use anyhow::Context;
use clap::{Parser, Subcommand};
use highlight_cli::{commands, Config};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdf-highlight")]
#[command(version, about = "Highlight key phrases in PDF documents")]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text of a PDF
    Extract {
        input: PathBuf,
        /// Succeed even when the PDF has no text layer
        #[arg(long)]
        allow_empty: bool,
    },
    /// Print highlight rectangles as JSON
    Locate {
        input: PathBuf,
        #[arg(long = "phrase")]
        phrases: Vec<String>,
        /// File with one key phrase per line
        #[arg(long)]
        phrases_file: Option<PathBuf>,
        /// Multiply rectangles for a rendered page at this scale
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },
    /// Draw highlights from a JSON file into a copy of the PDF
    Annotate {
        input: PathBuf,
        #[arg(long)]
        highlights: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Locate key phrases and write the highlighted copy
    Highlight {
        input: PathBuf,
        #[arg(long = "phrase")]
        phrases: Vec<String>,
        #[arg(long)]
        phrases_file: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read a JSON command from stdin and print the JSON result
    Exec,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries results, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Extract { input, allow_empty } => {
            print!("{}", commands::extract(&input, allow_empty)?);
        }
        Command::Locate {
            input,
            phrases,
            phrases_file,
            scale,
        } => {
            let phrases = commands::collect_phrases(&phrases, phrases_file.as_deref())?;
            let highlights = commands::locate(&input, &phrases, scale)?;
            let json = serde_json::to_string_pretty(&highlights)
                .context("Failed to serialize highlights")?;
            println!("{}", json);
        }
        Command::Annotate {
            input,
            highlights,
            output,
        } => {
            let highlights = commands::read_highlights(&highlights)?;
            let output = output.unwrap_or_else(|| config.output_path(&input));
            commands::annotate(&input, &highlights, &config.highlight_style()?, &output)?;
        }
        Command::Highlight {
            input,
            phrases,
            phrases_file,
            output,
        } => {
            let phrases = commands::collect_phrases(&phrases, phrases_file.as_deref())?;
            let output = output.unwrap_or_else(|| config.output_path(&input));
            let pages = commands::highlight(&input, &phrases, &config.highlight_style()?, &output)?;
            tracing::info!("Highlighted {} pages", pages);
        }
        Command::Exec => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read command from stdin")?;
            println!("{}", commands::exec(&json)?);
        }
    }

    Ok(())
}

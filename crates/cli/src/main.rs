use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use divvy_ocr::{Locale, RecognitionMode};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "divvy")]
#[command(
    version,
    about = "Turn receipt OCR output into a splittable list of bill items",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the two-pass analysis on a fixture and print the resulting items
    Items {
        /// JSON fixture of recognized fragments
        fixture: PathBuf,

        #[command(flatten)]
        parser: ParserArgs,

        /// Print items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print reconstructed lines with their classification
    Lines {
        /// JSON fixture of recognized fragments
        fixture: PathBuf,

        /// Which recognition pass to read from the fixture
        #[arg(long, value_enum, default_value_t = ModeArg::Accurate)]
        mode: ModeArg,

        #[command(flatten)]
        parser: ParserArgs,

        /// Print lines as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ParserArgs {
    /// Built-in keyword profile (overrides the config file's profile)
    #[arg(short, long, value_enum)]
    locale: Option<LocaleArg>,

    /// TOML parser config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep lines without a recognizable price
    #[arg(long)]
    allow_unpriced: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum LocaleArg {
    En,
    #[value(name = "it-en")]
    ItEn,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::En => Locale::English,
            LocaleArg::ItEn => Locale::ItalianEnglish,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum ModeArg {
    Accurate,
    Fast,
}

impl From<ModeArg> for RecognitionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Accurate => RecognitionMode::Accurate,
            ModeArg::Fast => RecognitionMode::Fast,
        }
    }
}

impl ParserArgs {
    fn into_config(self) -> Result<divvy_ocr::ParserConfig> {
        commands::parser_config(
            self.locale.map(Locale::from),
            self.config.as_deref(),
            self.allow_unpriced,
        )
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Items { fixture, parser, json } => {
            commands::items(&fixture, parser.into_config()?, json).await
        }
        Commands::Lines { fixture, mode, parser, json } => {
            commands::lines(&fixture, parser.into_config()?, mode.into(), json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

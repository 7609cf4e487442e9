use anyhow::{Context, Result};
use divvy_core::{BillItem, BillSession, Money};
use divvy_ocr::{
    FixtureRecognizer, LineClass, Locale, OcrBackend, ParserConfig, ReceiptParser,
    RecognitionMode, RecognitionOrchestrator,
};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize)]
pub struct ItemOutput {
    pub name: String,
    pub unit_price: Option<String>,
    pub quantity: u32,
    pub line_total: Option<String>,
}

impl From<&BillItem> for ItemOutput {
    fn from(item: &BillItem) -> Self {
        ItemOutput {
            name: item.name.clone(),
            unit_price: item.price.map(|p| p.to_string()),
            quantity: item.quantity,
            line_total: item.line_total().map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineOutput {
    pub line: String,
    /// `item` or the tag of the rule that dropped the line.
    pub class: String,
    /// Whether the line survives price, quantity and name extraction.
    pub accepted: bool,
}

/// Config file first, then command-line overrides.
pub fn parser_config(
    locale: Option<Locale>,
    config: Option<&Path>,
    allow_unpriced: bool,
) -> Result<ParserConfig> {
    let mut cfg = match config {
        Some(path) => ParserConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ParserConfig::for_locale(locale.unwrap_or_default()),
    };
    if let (Some(locale), Some(_)) = (locale, config) {
        cfg.profile = locale.profile();
    }
    if allow_unpriced {
        cfg.require_price = false;
    }
    Ok(cfg)
}

pub async fn items(fixture: &Path, config: ParserConfig, json: bool) -> Result<ExitCode> {
    let image = tokio::fs::read(fixture)
        .await
        .with_context(|| format!("Failed to read fixture {}", fixture.display()))?;

    let orchestrator = RecognitionOrchestrator::new(
        FixtureRecognizer,
        ReceiptParser::new(config),
        BillSession::new().shared(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match orchestrator.analyze(image, &cancel).await {
        Ok(items) => {
            let rows: Vec<ItemOutput> = items.iter().map(ItemOutput::from).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_items(&rows, &items);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::warn!(error = %e, "analysis produced no items");
            let message = orchestrator
                .session()
                .lock()
                .await
                .last_error()
                .map_or_else(|| e.to_string(), str::to_string);
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_items(rows: &[ItemOutput], items: &[BillItem]) {
    for row in rows {
        println!(
            "{:>3} x {:<32} {:>10} {:>10}",
            row.quantity,
            row.name,
            row.unit_price.as_deref().unwrap_or("-"),
            row.line_total.as_deref().unwrap_or("-"),
        );
    }
    let total: Money = items.iter().filter_map(BillItem::line_total).sum();
    println!("{:>59}", format!("total {total}"));
}

pub fn lines(
    fixture: &Path,
    config: ParserConfig,
    mode: RecognitionMode,
    json: bool,
) -> Result<()> {
    let image = std::fs::read(fixture)
        .with_context(|| format!("Failed to read fixture {}", fixture.display()))?;
    let fragments = FixtureRecognizer
        .recognize(&image, mode)
        .with_context(|| format!("Failed to recognize {}", fixture.display()))?;

    let parser = ReceiptParser::new(config);
    let rows: Vec<LineOutput> = parser
        .lines(&fragments)
        .into_iter()
        .map(|line| {
            let class = match parser.classifier().classify(&line) {
                LineClass::Item => "item".to_string(),
                LineClass::Noise(tag) => tag.to_string(),
            };
            let accepted = parser.parse_line(&line).is_some();
            LineOutput { line, class, accepted }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            let mark = if row.accepted { '+' } else { ' ' };
            println!("{mark} {:<10} {}", row.class, row.line);
        }
    }
    Ok(())
}

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use toc::render::outline::{to_indented, to_markdown};
use toc::{DocumentHandle, ExtractionConfig, InvalidTocSource, LopdfDocument, Source, TocNode, TocSource};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct SourceOptions {
    /// Path or http(s) URL of the PDF
    #[clap(env = "STUDYTOC_SOURCE")]
    pub source: String,

    /// TOML file with extraction settings
    #[arg(long, env = "STUDYTOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pause before the first page is read, in milliseconds
    #[arg(long, env = "STUDYTOC_SETTLE_MS")]
    pub settle_ms: Option<u64>,

    /// Attempts per document call
    #[arg(long, env = "STUDYTOC_ATTEMPTS")]
    pub attempts: Option<u32>,
}

impl SourceOptions {
    /// Settings from `--config`, with the individual flags on top.
    pub fn extraction_config(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                ExtractionConfig::from_file(path).map_err(|e| Error::Config(e.to_string()))?
            }
            None => ExtractionConfig::default(),
        };

        if let Some(settle_ms) = self.settle_ms {
            config.settle_delay_ms = settle_ms;
        }
        if let Some(attempts) = self.attempts {
            config.retry.attempts = attempts;
        }
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        log::debug!("Extraction settings: {:?}", config);
        Ok(config)
    }

    pub async fn open(&self, config: &ExtractionConfig) -> Result<LopdfDocument> {
        let source = Source::parse(&self.source);
        let document = toc::load_document(&source, config)
            .await
            .map_err(|e| Error::Load {
                source_name: self.source.clone(),
                reason: e.to_string(),
            })?;
        Ok(document)
    }
}

#[derive(Debug, Clone, PartialEq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text format (2 spaces per level)
    Indented,
    /// Markdown nested list format
    Markdown,
    /// JSON format with structured data
    Json,
}

#[derive(Debug, clap::Args, Clone)]
pub struct OutputOptions {
    /// Output format: indented, markdown, or json (default: indented)
    #[arg(long, env = "STUDYTOC_OUTPUT", default_value = "indented")]
    pub output: OutputFormat,

    /// Output as JSON (alias for --output json)
    #[arg(long)]
    pub json: bool,
}

impl OutputOptions {
    /// The `--json` flag takes precedence over `--output`.
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.output.clone()
        }
    }
}

#[derive(Debug, clap::Args, Clone)]
pub struct ExtractOptions {
    #[clap(flatten)]
    pub source: SourceOptions,

    #[clap(flatten)]
    pub output: OutputOptions,
}

fn parse_stage(value: &str) -> std::result::Result<TocSource, InvalidTocSource> {
    value.parse()
}

#[derive(Debug, clap::Args, Clone)]
pub struct StageOptions {
    /// Stage to run: bookmark, contents-page, text-structure or basic-structure
    #[arg(value_parser = parse_stage)]
    pub stage: TocSource,

    #[clap(flatten)]
    pub source: SourceOptions,

    #[clap(flatten)]
    pub output: OutputOptions,
}

#[derive(Debug, Serialize)]
pub struct TocOutput {
    pub source: String,
    pub pages: usize,
    /// Stage that produced the entries; absent when a single stage found nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<TocSource>,
    pub entries: Vec<TocNode>,
    pub elapsed_ms: u64,
}

pub async fn extract(options: ExtractOptions, _global: crate::Global) -> Result<()> {
    let config = options.source.extraction_config()?;
    let start = Instant::now();

    let document = options.source.open(&config).await?;
    let entries = toc::extract_table_of_contents(&document, &config)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;

    let output = TocOutput {
        source: options.source.source.clone(),
        pages: document.page_count(),
        stage: entries.first().map(|node| node.source),
        entries,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    print_output(&output, &options.output.format())
}

pub async fn stage(options: StageOptions, _global: crate::Global) -> Result<()> {
    let config = options.source.extraction_config()?;
    let start = Instant::now();

    let document = options.source.open(&config).await?;
    let entries = toc::run_stage(&document, options.stage, &config)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;

    let output = TocOutput {
        source: options.source.source.clone(),
        pages: document.page_count(),
        stage: (!entries.is_empty()).then_some(options.stage),
        entries,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    print_output(&output, &options.output.format())
}

/// Formats TOC output as JSON string
fn format_output_json(output: &TocOutput) -> Result<String> {
    serde_json::to_string_pretty(output).map_err(|e| eyre!("JSON serialization failed: {}", e))
}

fn format_entries(entries: &[TocNode], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Markdown => to_markdown(entries),
        _ => to_indented(entries),
    }
}

/// Formats the metadata block printed above the entries on a terminal.
fn format_output_text(output: &TocOutput, format: &OutputFormat) -> String {
    use colored::Colorize;

    let mut result = String::new();

    result.push_str(&f!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&f!("{}\n", "TABLE OF CONTENTS".bright_cyan().bold()));
    result.push_str(&f!("{}\n", "=".repeat(80).bright_cyan()));

    result.push_str(&f!(
        "\n{}: {}\n",
        "Source".green(),
        output.source.cyan().underline()
    ));
    result.push_str(&f!(
        "{}: {}\n",
        "Pages".green(),
        output.pages.to_string().bright_yellow().bold()
    ));
    let stage = output
        .stage
        .map(|stage| stage.to_string())
        .unwrap_or_else(|| "none".to_string());
    result.push_str(&f!("{}: {}\n", "Stage".green(), stage.bright_white().bold()));
    let total: usize = output.entries.iter().map(TocNode::subtree_len).sum();
    result.push_str(&f!(
        "{}: {}\n",
        "Entries".green(),
        total.to_string().bright_yellow().bold()
    ));
    result.push_str(&f!(
        "{}: {}\n",
        "Time".green(),
        f!("{} ms", output.elapsed_ms).bright_yellow()
    ));

    result.push_str(&f!("\n{}\n", "=".repeat(80).bright_yellow()));
    result.push_str(&f!("{}\n", "USAGE".bright_yellow().bold()));
    result.push_str(&f!("{}\n", "=".repeat(80).bright_yellow()));

    result.push_str(&f!("\n{}:\n", "To get JSON output".bright_white().bold()));
    result.push_str(&f!(
        "  {}\n",
        f!("studytoc extract {} --json", output.source).cyan()
    ));

    if !matches!(format, OutputFormat::Markdown) {
        result.push_str(&f!(
            "\n{}:\n",
            "To get markdown list format".bright_white().bold()
        ));
        result.push_str(&f!(
            "  {}\n",
            f!("studytoc extract {} --output markdown", output.source).cyan()
        ));
    }

    result.push_str(&f!("\n{}\n", "=".repeat(80).bright_magenta()));
    result.push_str(&f!("{}\n", "ENTRIES".bright_magenta().bold()));
    result.push_str(&f!("{}\n", "=".repeat(80).bright_magenta()));
    result.push('\n');

    result
}

fn print_output(output: &TocOutput, format: &OutputFormat) -> Result<()> {
    use colored::Colorize;

    if matches!(format, OutputFormat::Json) {
        println!("{}", format_output_json(output)?);
        return Ok(());
    }

    let content = format_entries(&output.entries, format);
    if std::io::stdout().is_terminal() {
        // Terminal output: metadata to stderr, content to stdout
        eprint!("{}", format_output_text(output, format));
        for line in content.lines() {
            println!("{}", line.white());
        }
    } else {
        println!("{}", content);
    }

    Ok(())
}

use serde::Serialize;
use toc::{DocumentHandle, TocNode, TocSource};

use crate::extract::SourceOptions;
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct InfoOptions {
    #[clap(flatten)]
    pub source: SourceOptions,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct StageSummary {
    pub stage: TocSource,
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct InfoOutput {
    pub source: String,
    pub pages: usize,
    pub outline_entries: usize,
    pub stages: Vec<StageSummary>,
    /// First stage in cascade order with any entries.
    pub winner: Option<TocSource>,
}

impl InfoOutput {
    fn new(source: String, pages: usize, outline_entries: usize, stages: Vec<StageSummary>) -> Self {
        let winner = stages
            .iter()
            .find(|summary| summary.entries > 0)
            .map(|summary| summary.stage);
        InfoOutput {
            source,
            pages,
            outline_entries,
            stages,
            winner,
        }
    }
}

pub async fn info(options: InfoOptions, _global: crate::Global) -> Result<()> {
    let mut config = options.source.extraction_config()?;
    let document = options.source.open(&config).await?;

    let outline_entries = match document.outline().await {
        Ok(Some(items)) => items.len(),
        Ok(None) => 0,
        Err(e) => {
            log::warn!("Outline is not readable: {}", e);
            0
        }
    };

    let mut stages = Vec::with_capacity(TocSource::CASCADE.len());
    for stage in TocSource::CASCADE {
        let nodes = toc::run_stage(&document, stage, &config)
            .await
            .map_err(|e| Error::Extraction(e.to_string()))?;
        stages.push(StageSummary {
            stage,
            entries: nodes.iter().map(TocNode::subtree_len).sum(),
        });
        // The document only needs to settle once.
        config.settle_delay_ms = 0;
    }

    let output = InfoOutput::new(
        options.source.source.clone(),
        document.page_count(),
        outline_entries,
        stages,
    );

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        format_table(&output).printstd();
    }
    Ok(())
}

fn format_table(output: &InfoOutput) -> prettytable::Table {
    let mut table = new_table();
    table.add_row(prettytable::row!["Source", output.source]);
    table.add_row(prettytable::row!["Pages", output.pages]);
    table.add_row(prettytable::row!["Top-level bookmarks", output.outline_entries]);
    for summary in &output.stages {
        let marker = if Some(summary.stage) == output.winner {
            "  <- used"
        } else {
            ""
        };
        table.add_row(prettytable::row![
            f!("Stage {}", summary.stage),
            f!("{}{}", summary.entries, marker)
        ]);
    }
    table
}

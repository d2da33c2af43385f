use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use sec_analyzer::{
    core::config::AnalyzerConfig,
    edgar::parsing::{parse_manifest, text::html_to_text, ChartRecord, FilingParser, Lexicon},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "sec-analyzer", about = "Extract sections, facts and statements from SEC filings")]
enum Command {
    /// Parse HTML filings: sections, inline facts and key metrics
    Html {
        #[structopt(parse(from_os_str), required = true)]
        inputs: Vec<PathBuf>,

        /// Print only the overview and key metrics
        #[structopt(long)]
        summary: bool,
    },
    /// Parse standalone XBRL instance documents
    Xbrl {
        #[structopt(parse(from_os_str), required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Classify the statement pages listed in a FilingSummary.xml
    Charts {
        #[structopt(parse(from_os_str))]
        manifest: PathBuf,

        /// Directory holding the R*.htm pages named by the manifest
        #[structopt(long, parse(from_os_str))]
        content_dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct FileReport {
    path: String,
    #[serde(flatten)]
    outcome: Value,
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parses every input on the blocking pool and keeps the input order.
async fn process_all<F>(inputs: Vec<PathBuf>, config: AnalyzerConfig, parse: F) -> Vec<FileReport>
where
    F: Fn(&FilingParser<'static>, &str) -> Result<Value> + Copy + Send + 'static,
{
    let tasks = inputs.into_iter().map(|path| {
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            let parser = FilingParser::new(Lexicon::global(), config);
            let outcome = read_input(&path).and_then(|content| parse(&parser, &content));
            let outcome = match outcome {
                Ok(value) => value,
                Err(e) => {
                    log::error!("{}: {:#}", path.display(), e);
                    json!({ "error": format!("{:#}", e) })
                }
            };
            FileReport {
                path: path.display().to_string(),
                outcome,
            }
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .filter_map(|joined| match joined {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Parsing task failed: {}", e);
                None
            }
        })
        .collect()
}

fn chart_records(manifest: &Path, content_dir: Option<&Path>) -> Result<Vec<ChartRecord>> {
    let entries = parse_manifest(&read_input(manifest)?)?;
    log::info!("Manifest {} lists {} reports", manifest.display(), entries.len());

    entries
        .iter()
        .map(|entry| -> Result<ChartRecord> {
            let mut record = entry.to_chart_record();
            if let (Some(dir), Some(file)) = (content_dir, entry.html_file_name.as_deref()) {
                let path = dir.join(file);
                if path.exists() {
                    record = record.with_content(html_to_text(&read_input(&path)?));
                } else {
                    log::warn!("Chart page {} not found", path.display());
                }
            }
            Ok(record)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    log::debug!("Logger initialized");

    let config = AnalyzerConfig::from_env()?;
    let command = Command::from_args();

    let output = match command {
        Command::Html { inputs, summary } => {
            let reports = process_all(inputs, config, move |parser, content| {
                let parsed = parser.parse_html(content);
                if summary {
                    Ok(json!({
                        "overview": parsed.overview,
                        "key_metrics": parsed.key_metrics,
                    }))
                } else {
                    Ok(serde_json::to_value(parsed)?)
                }
            })
            .await;
            serde_json::to_value(reports)?
        }
        Command::Xbrl { inputs } => {
            let reports = process_all(inputs, config, |parser, content| {
                Ok(serde_json::to_value(parser.parse_xbrl(content)?)?)
            })
            .await;
            serde_json::to_value(reports)?
        }
        Command::Charts {
            manifest,
            content_dir,
        } => {
            let records = chart_records(&manifest, content_dir.as_deref())?;
            if records.is_empty() {
                return Err(anyhow!("No reports listed in {}", manifest.display()));
            }
            let parser = FilingParser::new(Lexicon::global(), config);
            serde_json::to_value(parser.standardize_charts(&records))?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

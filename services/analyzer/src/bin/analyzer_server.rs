//! Standalone analyzer ingest server
//!
//! Development harness: runs the gateway against an in-memory lab-result
//! store seeded with a CBC template and one pending sample, so an instrument
//! (or `netcat`) can be pointed at it end to end. Production hosts embed
//! [`AnalyzerServer`] directly and supply repositories backed by their own
//! lab-result tables.

use anyhow::Result;
use clap::Parser;
use labwire_analyzer::{AnalyzerServer, MemoryLabStore, ResultProcessor, ResultSource};
use labwire_config::AnalyzerConfig;
use labwire_types::{FieldType, MessageField, TemplateField, TemplateStructure};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "analyzer_server", about = "Labwire analyzer ingest server")]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    config.validate()?;
    if !config.enabled {
        info!("enabling listener for standalone run");
        config.enabled = true;
    }

    let store = Arc::new(MemoryLabStore::new());
    let template_id = store.add_template(cbc_template());
    let pending = store.create_pending(ResultSource::Outpatient, template_id);
    let sample_no = store.issue_sample_no(&pending)?;
    info!(%sample_no, "seeded pending lab result; send a transmission carrying this sample number");

    let processor = Arc::new(ResultProcessor::new(store.clone(), store.clone()));
    let mut server = AnalyzerServer::new(config, processor);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}

fn numeric(name: &str, label: &str, unit: &str, min: f64, max: f64) -> TemplateField {
    TemplateField {
        name: name.to_string(),
        label: label.to_string(),
        field_type: FieldType::Numeric,
        unit: unit.to_string(),
        reference_min: Some(min),
        reference_max: Some(max),
    }
}

fn cbc_template() -> TemplateStructure {
    TemplateStructure {
        fields: vec![
            numeric("WBC", "White Blood Cells", "10^3/uL", 4.0, 11.0),
            numeric("RBC", "Red Blood Cells", "10^6/uL", 4.2, 6.1),
            numeric("HGB", "Hemoglobin", "g/dL", 12.0, 18.0),
            numeric("HCT", "Hematocrit", "%", 37.0, 52.0),
            numeric("MCV", "Mean Corpuscular Volume", "fL", 80.0, 100.0),
            numeric("PLT", "Platelets", "10^3/uL", 150.0, 450.0),
        ],
        message_fields: vec![
            MessageField {
                name: "WBC IP Message".to_string(),
            },
            MessageField {
                name: "PLT IP Message".to_string(),
            },
        ],
    }
}

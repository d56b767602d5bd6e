//! # Labwire Analyzer Ingest Service
//!
//! Application layer between the wire codec and the lab-result store:
//! accepts instrument connections, decodes ASTM transmissions, maps
//! instrument test codes onto result templates, correlates each transmission
//! with its pending lab result by sample number, and merges the values into
//! the persisted document.
//!
//! The server is an explicit handle owned by the host's composition root:
//! construct an [`AnalyzerServer`], call [`AnalyzerServer::start`], and call
//! [`AnalyzerServer::stop`] on the way down. Storage is reached only through
//! the [`storage`] traits; the host supplies implementations backed by its
//! lab-result tables.

pub mod connection;
pub mod mapper;
pub mod processor;
pub mod server;
pub mod storage;

pub use mapper::map_to_template;
pub use processor::ResultProcessor;
pub use server::AnalyzerServer;
pub use storage::{
    LabResultRef, LabResultRepository, MemoryLabStore, ResultSource, StorageError,
    StoredLabResult, TemplateRepository,
};

use labwire_config::ConfigError;

/// Analyzer service errors
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("No pending lab result for sample ID {0}")]
    Correlation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
}

/// Result type for analyzer operations
pub type AnalyzerResult<T> = std::result::Result<T, AnalyzerError>;

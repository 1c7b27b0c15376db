use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KeggError {
    #[error("invalid gene name: {0:?}")]
    InvalidGeneName(String),

    #[error("invalid species code: {0}")]
    InvalidSpecies(String),

    #[error("invalid KEGG identifier: {0}")]
    InvalidExternalId(String),

    #[error("invalid pathway id: {0}")]
    InvalidPathwayId(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("KEGG request failed: {0}")]
    KeggHttp(String),

    #[error("KEGG returned status {status}: {message}")]
    KeggStatus { status: u16, message: String },

    #[error("Error fetching pathway data: {0}")]
    PathwayData(String),

    #[error("No genes provided. Please enter genes or upload a file.")]
    #[diagnostic(help("pass gene names as arguments or use --genes-file"))]
    NoGenes,

    #[error("No KEGG IDs found for the provided genes.")]
    NoIdentifiers,

    #[error("No images found in the output folder.")]
    #[diagnostic(help("run `kegg-map map` or `kegg-map render` first"))]
    NoImages,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl KeggError {
    /// Message of the remote failure without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            KeggError::KeggHttp(message) | KeggError::PathwayData(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// The run had nothing to work on or produced nothing, as opposed to
    /// failing.
    pub fn is_nothing_found(&self) -> bool {
        matches!(
            self,
            KeggError::NoGenes | KeggError::NoIdentifiers | KeggError::NoImages
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            KeggError::KeggHttp(_) | KeggError::KeggStatus { .. } | KeggError::PathwayData(_)
        )
    }
}

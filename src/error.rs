//! Error types shared by the export pipeline.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering or exporting a deck.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No panel container is mounted")]
    MissingContainer,

    #[error("Panel {0} is not mounted")]
    MissingPanel(usize),

    #[error("Failed to rasterize panel {index}: {reason}")]
    Rasterization { index: usize, reason: String },

    #[error("Failed to resolve image resource: {0}")]
    Resource(String),

    #[error("Document assembly failed: {0}")]
    Assembly(String),

    #[error("Image encoding failed: {0}")]
    Image(String),

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Invalid deck: {0}")]
    Deck(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_display_string() {
        let err = Error::Rasterization {
            index: 2,
            reason: "unreachable".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Failed to rasterize panel 2: unreachable\"");
    }
}

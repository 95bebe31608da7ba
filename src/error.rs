//! Error taxonomy for the proposal build pipeline.
//!
//! Each stage reports its own error type. [`BuildError`] is the single failure
//! surfaced by [`crate::generator::ProposalGenerator::generate`] and always carries
//! the stage error that aborted the build as its source.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::fonts::FontError;
use crate::richtext::ParseError;

/// Failures while writing, reading or removing the files a build produces.
#[derive(Debug, Error)]
pub enum ArtifactIoError {
    /// The output directory could not be created.
    #[error("cannot prepare output directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A rendered raster could not be encoded or written.
    #[error("cannot write artifact {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The finished document could not be rewritten.
    #[error("cannot write document {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The composed document could not be read back.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A temporary artifact could not be deleted.
    #[error("cannot remove artifact {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures while producing the chart or table rasters.
#[derive(Debug, Error)]
pub enum RenderingError {
    #[error("raster fonts unavailable: {0}")]
    Font(#[from] FontError),
    #[error("cannot register raster font '{family}'")]
    FontRegistration { family: &'static str },
    #[error("failed to draw {artifact}: {message}")]
    Draw {
        artifact: &'static str,
        message: String,
    },
    #[error(transparent)]
    Artifact(#[from] ArtifactIoError),
}

impl RenderingError {
    pub(crate) fn draw(artifact: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Draw {
            artifact,
            message: err.to_string(),
        }
    }
}

/// Failures while assembling the PDF document.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("rendered artifact missing at {}", path.display())]
    MissingArtifact { path: PathBuf },
    #[error("cannot load {name} image: {source}")]
    Asset {
        name: &'static str,
        #[source]
        source: genpdf::error::Error,
    },
    #[error("document fonts unavailable: {0}")]
    Font(#[from] FontError),
    #[error("invalid text markup: {0}")]
    Markup(#[from] ParseError),
    #[error("invalid layout instructions: {0}")]
    Layout(String),
    #[error("PDF backend failure: {0}")]
    Backend(#[from] genpdf::error::Error),
}

/// The single failure reported by a proposal build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("proposal build failed while rendering: {0}")]
    Rendering(#[from] RenderingError),
    #[error("proposal build failed while composing: {0}")]
    Composition(#[from] CompositionError),
    #[error("proposal build failed on file access: {0}")]
    Artifact(#[from] ArtifactIoError),
    #[cfg(feature = "bookmarks")]
    #[error("proposal build failed while adding bookmarks: {0}")]
    Bookmarks(#[from] crate::bookmarks::BookmarkError),
}

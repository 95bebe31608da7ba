//! Commercial proposal PDFs for solar installations.
//!
//! A [`ProposalGenerator`] turns a [`ProposalInput`] into a branded multi-page
//! PDF: derived financial metrics, a monthly production chart, a payback
//! schedule table and the fixed company texts laid out on a cover and three
//! content pages.

pub mod artifact;
pub mod builder;
pub mod chart;
pub mod composer;
pub mod config;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod format;
pub mod generator;
pub mod imaging;
pub mod layout;
pub mod metrics;
pub mod model;
mod raster;
pub mod richtext;
pub mod style;
pub mod table;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use config::{AssetSource, BrandAssets, CompanyProfile, ProposalConfig};
pub use error::{ArtifactIoError, BuildError, CompositionError, RenderingError};
pub use generator::{BuildSummary, ProposalDocument, ProposalGenerator};
pub use model::{
    DerivedMetrics, Month, PaybackYear, ProductionSample, ProposalInput, RenderedArtifact,
    ValidationError,
};

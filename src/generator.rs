//! End-to-end proposal builds.
//!
//! [`ProposalGenerator::generate`] runs the whole pipeline for one input:
//! metrics, the two rasters, the PDF and the cleanup of every scratch file.
//! Builds share nothing but the immutable configuration, so a generator can
//! serve concurrent requests from several threads.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, warn};
use serde::Serialize;

use crate::artifact::{ensure_dir, remove_artifact, unique_token, ArtifactGuard};
use crate::chart::ChartRenderer;
use crate::composer::{Artifacts, CompositionReport, DocumentComposer};
use crate::config::ProposalConfig;
use crate::error::{ArtifactIoError, BuildError};
use crate::model::{DerivedMetrics, ProposalInput};
use crate::table::TableRenderer;

/// Route the request layer serves finished documents from.
pub const DOWNLOAD_ROUTE: &str = "/api/v1/download";

/// Longest client slug kept in a document file name.
pub const MAX_SLUG_LEN: usize = 64;

/// A finished proposal.
#[derive(Debug)]
pub struct ProposalDocument {
    pub filename: String,
    /// Where the PDF was written inside the output directory.
    pub path: PathBuf,
    pub download_url: String,
    pub bytes: Vec<u8>,
    pub metrics: DerivedMetrics,
    pub page_count: usize,
    pub report: CompositionReport,
    /// Scratch files that could not be deleted. They never fail a build.
    pub cleanup_errors: Vec<ArtifactIoError>,
}

impl ProposalDocument {
    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            success: true,
            message: "Proposta gerada com sucesso".to_owned(),
            filename: self.filename.clone(),
            url: self.download_url.clone(),
            pdf_base64: STANDARD.encode(&self.bytes),
            metrics: self.metrics.clone(),
            page_count: self.page_count,
        }
    }
}

/// Serializable response describing a finished build, keyed the way the
/// download API reports it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BuildSummary {
    pub success: bool,
    pub message: String,
    #[serde(rename = "pdf_filename")]
    pub filename: String,
    #[serde(rename = "pdf_url")]
    pub url: String,
    /// The document bytes, standard base64 with padding.
    pub pdf_base64: String,
    #[serde(rename = "dados_calculados")]
    pub metrics: DerivedMetrics,
    pub page_count: usize,
}

/// `proposta_<client slug>_<token>.pdf`
///
/// Slugs longer than [`MAX_SLUG_LEN`] are cut back to a word boundary.
pub fn document_filename(client_name: &str) -> String {
    let slug = slug::slugify(client_name).replace('-', "_");
    let slug = truncate_slug(&slug);
    if slug.is_empty() {
        format!("proposta_{}.pdf", unique_token())
    } else {
        format!("proposta_{slug}_{}.pdf", unique_token())
    }
}

fn truncate_slug(slug: &str) -> &str {
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    // slugify only emits ASCII, so every index is a char boundary.
    let head = &slug[..MAX_SLUG_LEN];
    let cut = match slug.as_bytes()[MAX_SLUG_LEN] {
        b'_' => head,
        _ => head.rfind('_').map_or(head, |index| &head[..index]),
    };
    cut.trim_end_matches('_')
}

pub fn download_url(filename: &str) -> String {
    format!("{DOWNLOAD_ROUTE}/{filename}")
}

/// Builds proposals with one configuration.
#[derive(Clone, Debug)]
pub struct ProposalGenerator {
    config: ProposalConfig,
}

impl ProposalGenerator {
    pub fn new(config: ProposalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProposalConfig {
        &self.config
    }

    /// Builds the proposal for an already validated `input`.
    ///
    /// Any failure aborts the build and removes every file it created.
    pub fn generate(&self, input: &ProposalInput) -> Result<ProposalDocument, BuildError> {
        let config = &self.config;
        let output_dir = config.output_dir.as_path();
        ensure_dir(output_dir)?;

        let metrics = DerivedMetrics::from_input(input);
        debug!(
            "metrics for '{}': total {:.2}, payback year {:?}",
            input.client_name, metrics.total_investment, metrics.payback_year
        );

        let chart = ChartRenderer::new(&config.palette, &config.chart).render(
            &input.monthly_production,
            input.modules_quantity,
            output_dir,
        )?;
        let chart_guard = ArtifactGuard::new(chart.clone());
        let table = TableRenderer::new(&config.palette, &config.table)
            .render(&input.payback_schedule, output_dir)?;
        let table_guard = ArtifactGuard::new(table.clone());

        let filename = document_filename(&input.client_name);
        let path = output_dir.join(&filename);
        let report = DocumentComposer::new(config)
            .compose(
                input,
                &metrics,
                Artifacts {
                    chart: &chart,
                    table: &table,
                },
                &path,
            )
            .map_err(|err| discard(&path, err.into()))?;
        let bytes = read_document(&path)?;

        #[cfg(feature = "bookmarks")]
        let bytes = {
            let bytes = crate::bookmarks::apply_section_bookmarks(&bytes, &report)
                .map_err(|err| discard(&path, err.into()))?;
            fs::write(&path, &bytes).map_err(|source| {
                discard(
                    &path,
                    ArtifactIoError::Persist {
                        path: path.clone(),
                        source,
                    }
                    .into(),
                )
            })?;
            bytes
        };

        let cleanup_errors: Vec<ArtifactIoError> = [chart_guard, table_guard]
            .into_iter()
            .filter_map(|guard| guard.release().err())
            .collect();
        for err in &cleanup_errors {
            warn!("{err}");
        }

        info!(
            "built {} ({} pages, {} bytes)",
            filename,
            report.page_count(),
            bytes.len()
        );
        Ok(ProposalDocument {
            download_url: download_url(&filename),
            filename,
            path,
            bytes,
            metrics,
            page_count: report.page_count(),
            report,
            cleanup_errors,
        })
    }
}

fn read_document(path: &Path) -> Result<Vec<u8>, BuildError> {
    fs::read(path).map_err(|source| {
        discard(
            path,
            ArtifactIoError::Read {
                path: path.to_path_buf(),
                source,
            }
            .into(),
        )
    })
}

/// Removes a partially written document before `err` is reported.
fn discard(path: &Path, err: BuildError) -> BuildError {
    if let Err(cleanup) = remove_artifact(path) {
        warn!("{cleanup}");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_slug_the_client_name() {
        let name = document_filename("João da Silva & Filhos");
        assert!(name.starts_with("proposta_joao_da_silva_filhos_"), "{name}");
        assert!(name.ends_with(".pdf"));
        let token = &name["proposta_joao_da_silva_filhos_".len()..name.len() - 4];
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(document_filename("Ana"), document_filename("Ana"));
    }

    #[test]
    fn unnamed_clients_still_get_a_filename() {
        let name = document_filename("***");
        assert!(name.starts_with("proposta_"));
        assert_eq!(name.len(), "proposta_".len() + 8 + ".pdf".len());
    }

    #[test]
    fn long_client_names_are_cut_at_a_word_boundary() {
        let client = "Condominio Residencial Jardim das Palmeiras ".repeat(8);
        let name = document_filename(&client);
        let slug = &name["proposta_".len()..name.len() - "_0a1b2c3d.pdf".len()];

        assert!(slug.len() <= MAX_SLUG_LEN, "{name}");
        assert!(slug.starts_with("condominio_residencial_jardim_das_palmeiras_"));
        assert!(!slug.ends_with('_'));
        assert!(!slug.contains("__"));
        assert!(client.to_lowercase().replace(' ', "_").starts_with(slug));
        assert!(name.len() < 255);
    }

    #[test]
    fn unbroken_slugs_are_cut_at_the_limit() {
        let name = document_filename(&"a".repeat(300));
        assert_eq!(
            name.len(),
            "proposta_".len() + MAX_SLUG_LEN + "_".len() + 8 + ".pdf".len()
        );
    }

    #[test]
    fn download_url_points_at_the_route() {
        assert_eq!(
            download_url("proposta_ana_0a1b2c3d.pdf"),
            "/api/v1/download/proposta_ana_0a1b2c3d.pdf"
        );
    }

    #[test]
    fn summary_serializes_metrics() {
        let document = ProposalDocument {
            filename: "proposta_ana_0a1b2c3d.pdf".into(),
            path: PathBuf::from("/tmp/proposta_ana_0a1b2c3d.pdf"),
            download_url: download_url("proposta_ana_0a1b2c3d.pdf"),
            bytes: b"%PDF-1.4".to_vec(),
            metrics: DerivedMetrics {
                total_investment: 70_000.0,
                payback_year: Some(4),
                payback_value: Some(150.5),
                cumulative_savings_25y: 250_000.0,
            },
            page_count: 4,
            report: CompositionReport {
                pages: Vec::new(),
                section_pages: Vec::new(),
            },
            cleanup_errors: Vec::new(),
        };
        let json = serde_json::to_value(document.summary()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pdf_filename"], "proposta_ana_0a1b2c3d.pdf");
        assert_eq!(json["pdf_url"], "/api/v1/download/proposta_ana_0a1b2c3d.pdf");
        assert_eq!(json["pdf_base64"], "JVBERi0xLjQ=");
        assert_eq!(json["dados_calculados"]["ano_payback"], 4);
        assert_eq!(json["dados_calculados"]["investimento_total"], 70_000.0);
        assert_eq!(json["dados_calculados"]["economia_25_anos"], 250_000.0);
        assert_eq!(json["page_count"], 4);
        assert!(json.get("url").is_none());
    }
}

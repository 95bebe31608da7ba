use std::fs;
use std::path::Path;

use solar_proposal::fonts;
use solar_proposal::layout::{PageTemplate, ProposalSection};
use solar_proposal::{
    AssetSource, BrandAssets, BuildError, CompositionError, Month, PaybackYear, ProductionSample,
    ProposalConfig, ProposalGenerator, ProposalInput,
};

fn fonts_or_skip(test: &str) -> bool {
    if fonts::fonts_available() {
        return true;
    }
    eprintln!(
        "Skipping {test}: no usable fonts. Set SOLAR_PROPOSAL_FONTS_DIR or copy assets/fonts next to the binary."
    );
    false
}

fn sample_input(years: u32) -> ProposalInput {
    let mut monthly_production: Vec<ProductionSample> = (1..=12u8)
        .map(|month| ProductionSample {
            month: Month::Calendar(month),
            total_generation_kwh: 4_000.0 + f64::from(month) * 75.0,
        })
        .collect();
    monthly_production.push(ProductionSample {
        month: Month::Average,
        total_generation_kwh: 4_487.5,
    });

    ProposalInput {
        client_name: "Maria Eduarda Gonçalves".into(),
        modules_quantity: 60,
        module_spec: "620W Mono Honor Solar".into(),
        inverter_quantity: 2,
        inverter_spec: "SOFAR 20kW".into(),
        kit_investment: 55_000.0,
        labor_investment: 15_000.0,
        monthly_production,
        payback_schedule: (1..=years)
            .map(|year| PaybackYear {
                year,
                balance: -70_000.0 + 18_500.0 * f64::from(year),
                avg_monthly_savings: 1_540.0,
                annual_savings: 18_500.0,
            })
            .collect(),
    }
}

fn files_in(dir: &Path, extension: &str) -> Vec<String> {
    fs::read_dir(dir)
        .expect("read output dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(extension))
        .collect()
}

#[test]
fn builds_a_complete_proposal() {
    if !fonts_or_skip("builds_a_complete_proposal") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let generator = ProposalGenerator::new(ProposalConfig::new(dir.path()));
    let document = generator.generate(&sample_input(25)).expect("build proposal");

    assert!(document.bytes.starts_with(b"%PDF"));
    assert_eq!(fs::read(&document.path).expect("read pdf"), document.bytes);
    assert!(document.filename.starts_with("proposta_maria_eduarda_goncalves_"));
    assert_eq!(
        document.download_url,
        format!("/api/v1/download/{}", document.filename)
    );
    assert!(document.cleanup_errors.is_empty());
    assert_eq!(document.metrics.payback_year, Some(4));

    let report = &document.report;
    assert_eq!(document.page_count, report.page_count());
    assert!(document.page_count >= 4);
    assert_eq!(report.pages[0], PageTemplate::Cover);
    assert!(report.pages[1..]
        .iter()
        .all(|template| *template == PageTemplate::Content));

    assert_eq!(report.section_page(ProposalSection::Cover), Some(1));
    assert_eq!(report.section_page(ProposalSection::Company), Some(2));
    let financial = report.section_page(ProposalSection::Financial).expect("financial");
    let results = report.section_page(ProposalSection::Results).expect("results");
    assert!(financial > 2);
    assert!(results > financial);
}

#[test]
fn overflowing_cover_text_keeps_a_single_cover_page() {
    if !fonts_or_skip("overflowing_cover_text_keeps_a_single_cover_page") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let generator = ProposalGenerator::new(ProposalConfig::new(dir.path()));
    let mut input = sample_input(25);
    input.client_name = format!("Ana {}", "& ".repeat(700));
    let document = generator.generate(&input).expect("build proposal");

    let report = &document.report;
    assert_eq!(report.pages[0], PageTemplate::Cover);
    assert_eq!(
        report
            .pages
            .iter()
            .filter(|template| **template == PageTemplate::Cover)
            .count(),
        1
    );
    assert!(report.section_page(ProposalSection::Company).expect("company") > 2);
}

#[test]
fn very_long_client_names_still_build() {
    if !fonts_or_skip("very_long_client_names_still_build") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let generator = ProposalGenerator::new(ProposalConfig::new(dir.path()));
    let mut input = sample_input(25);
    input.client_name = "Condominio Residencial Jardim das Palmeiras ".repeat(8);
    let document = generator.generate(&input).expect("build proposal");

    assert!(document.filename.starts_with("proposta_condominio_residencial_"));
    assert!(document.filename.len() < 255);
    assert_eq!(files_in(dir.path(), ".pdf"), vec![document.filename.clone()]);
}

#[test]
fn scratch_rasters_are_removed_after_a_build() {
    if !fonts_or_skip("scratch_rasters_are_removed_after_a_build") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let generator = ProposalGenerator::new(ProposalConfig::new(dir.path()));
    let document = generator.generate(&sample_input(3)).expect("build proposal");

    assert!(files_in(dir.path(), ".png").is_empty());
    assert_eq!(files_in(dir.path(), ".pdf"), vec![document.filename.clone()]);
    assert_eq!(document.metrics.payback_year, None);
}

#[test]
fn failed_builds_leave_nothing_behind() {
    if !fonts_or_skip("failed_builds_leave_nothing_behind") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ProposalConfig::new(dir.path()).with_assets(BrandAssets {
        cover_background: Some(AssetSource::Path(dir.path().join("missing_cover.png"))),
        logo: None,
    });
    let err = ProposalGenerator::new(config)
        .generate(&sample_input(25))
        .expect_err("missing cover must fail the build");

    assert!(matches!(
        err,
        BuildError::Composition(CompositionError::Asset {
            name: "cover background",
            ..
        })
    ));
    assert!(files_in(dir.path(), ".png").is_empty());
    assert!(files_in(dir.path(), ".pdf").is_empty());
}

#[test]
fn longer_schedules_take_more_pages() {
    if !fonts_or_skip("longer_schedules_take_more_pages") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let generator = ProposalGenerator::new(ProposalConfig::new(dir.path()));
    let short = generator.generate(&sample_input(1)).expect("short build");
    let long = generator.generate(&sample_input(25)).expect("long build");
    assert!(long.page_count > short.page_count);
}

#[test]
fn concurrent_builds_do_not_collide() {
    if !fonts_or_skip("concurrent_builds_do_not_collide") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let generator = ProposalGenerator::new(ProposalConfig::new(dir.path()));
    let input = sample_input(25);

    let mut filenames: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| generator.generate(&input).expect("concurrent build")))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("build thread").filename)
            .collect()
    });

    filenames.sort();
    filenames.dedup();
    assert_eq!(filenames.len(), 4);
    assert_eq!(files_in(dir.path(), ".pdf").len(), 4);
    assert!(files_in(dir.path(), ".png").is_empty());
}

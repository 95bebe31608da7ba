//! Monthly production bar chart.
//!
//! One bar pair per sample: the per-module estimate next to the total
//! generation, each with its integer value printed above the bar.

use std::path::Path;

use log::debug;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::artifact::{unique_artifact_path, write_png};
use crate::error::RenderingError;
use crate::format::format_number_br;
use crate::metrics::per_module_generation;
use crate::model::{Month, ProductionSample, RenderedArtifact};
use crate::raster::{self, font, DrawResult};
use crate::style::{BrandPalette, ChartStyle};

const ARTIFACT: &str = "production chart";
const FILE_PREFIX: &str = "grafico_producao";

/// Per-module generation for every sample, rounded half-to-even to whole kWh.
///
/// A module count of zero yields a series of zeros.
pub fn per_module_series(samples: &[ProductionSample], module_count: u32) -> Vec<f64> {
    samples
        .iter()
        .map(|sample| per_module_generation(sample.total_generation_kwh, module_count).round_ties_even())
        .collect()
}

/// Renders the production chart with a fixed palette and geometry.
pub struct ChartRenderer<'a> {
    palette: &'a BrandPalette,
    style: &'a ChartStyle,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(palette: &'a BrandPalette, style: &'a ChartStyle) -> Self {
        Self { palette, style }
    }

    /// Writes the chart as a uniquely named PNG inside `output_dir`.
    pub fn render(
        &self,
        samples: &[ProductionSample],
        module_count: u32,
        output_dir: &Path,
    ) -> Result<RenderedArtifact, RenderingError> {
        let pixels = self.render_rgb(samples, module_count)?;
        let path = unique_artifact_path(output_dir, FILE_PREFIX, "png");
        let artifact = write_png(&path, &pixels, self.style.width_px, self.style.height_px)?;
        debug!(
            "rendered {} with {} samples to {}",
            ARTIFACT,
            samples.len(),
            artifact.path.display()
        );
        Ok(artifact)
    }

    /// Renders the chart into a raw RGB buffer of `width_px * height_px * 3` bytes.
    pub fn render_rgb(
        &self,
        samples: &[ProductionSample],
        module_count: u32,
    ) -> Result<Vec<u8>, RenderingError> {
        let per_module = per_module_series(samples, module_count);
        let totals: Vec<f64> = samples.iter().map(|s| s.total_generation_kwh).collect();
        raster::paint(ARTIFACT, self.style.width_px, self.style.height_px, |root| {
            self.draw(root, samples, &per_module, &totals)
        })
    }

    fn tick_label(&self, month: Month) -> String {
        match month {
            Month::Calendar(number) => number.to_string(),
            Month::Average => self.style.average_label.to_owned(),
        }
    }

    fn draw(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
        samples: &[ProductionSample],
        per_module: &[f64],
        totals: &[f64],
    ) -> DrawResult {
        let style = self.style;
        let primary = raster::color(self.palette.primary);
        let accent = raster::color(self.palette.accent);
        let neutral = raster::color(self.palette.neutral);
        let width = style.bar_width;

        let peak = per_module
            .iter()
            .chain(totals)
            .copied()
            .fold(0.0, f64::max)
            .max(1.0);
        let last_x = (samples.len() as f64 - 0.4).max(0.6);

        let mut chart = ChartBuilder::on(root)
            .margin(30)
            .caption(style.title, font(style.title_font_px, true).color(&primary))
            .x_label_area_size(90)
            .y_label_area_size(110)
            .build_cartesian_2d(-0.6..last_x, 0.0..peak * 1.15)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_labels(8)
            .y_label_formatter(&|value| format_number_br(*value, 0))
            .x_desc(style.x_description)
            .y_desc(style.y_description)
            .axis_desc_style(font(style.label_font_px, true).color(&primary))
            .label_style(font(style.label_font_px, false).color(&primary))
            .axis_style(&neutral)
            .bold_line_style(&neutral.mix(0.3))
            .light_line_style(&WHITE)
            .draw()?;

        chart
            .draw_series(per_module.iter().enumerate().map(|(index, value)| {
                let x = index as f64;
                Rectangle::new([(x - width, 0.0), (x, *value)], primary.filled())
            }))?
            .label(style.per_module_label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 8), (x + 24, y + 8)], primary.filled()));

        chart
            .draw_series(totals.iter().enumerate().map(|(index, value)| {
                let x = index as f64;
                Rectangle::new([(x, 0.0), (x + width, *value)], accent.filled())
            }))?
            .label(style.total_label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 8), (x + 24, y + 8)], accent.filled()));

        let value_style = font(style.value_font_px, true)
            .color(&primary)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        for (values, offset) in [(per_module, -width / 2.0), (totals, width / 2.0)] {
            chart.draw_series(values.iter().enumerate().map(|(index, value)| {
                EmptyElement::at((index as f64 + offset, *value))
                    + Text::new(
                        format!("{}", value.trunc() as i64),
                        (0, -6),
                        value_style.clone(),
                    )
            }))?;
        }

        let tick_style = font(style.label_font_px, false)
            .color(&primary)
            .pos(Pos::new(HPos::Center, VPos::Top));
        for (index, sample) in samples.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(index as f64, 0.0));
            root.draw(&Text::new(
                self.tick_label(sample.month),
                (x, y + 10),
                tick_style.clone(),
            ))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE)
            .border_style(&neutral)
            .label_font(font(style.label_font_px, false).color(&primary))
            .draw()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts;
    use sha2::{Digest, Sha256};

    fn samples() -> Vec<ProductionSample> {
        let mut samples: Vec<_> = (1..=12)
            .map(|month| ProductionSample {
                month: Month::Calendar(month),
                total_generation_kwh: 4_000.0 + 100.0 * f64::from(month),
            })
            .collect();
        samples.push(ProductionSample {
            month: Month::Average,
            total_generation_kwh: 4_650.0,
        });
        samples
    }

    #[test]
    fn zero_modules_yield_zero_series() {
        assert!(per_module_series(&samples(), 0).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn per_module_values_round_half_to_even() {
        let samples = vec![
            ProductionSample {
                month: Month::Calendar(1),
                total_generation_kwh: 25.0,
            },
            ProductionSample {
                month: Month::Calendar(2),
                total_generation_kwh: 35.0,
            },
        ];
        assert_eq!(per_module_series(&samples, 10), vec![2.0, 4.0]);
    }

    #[test]
    fn tick_labels_use_month_or_average_marker() {
        let palette = BrandPalette::default();
        let style = ChartStyle::default();
        let renderer = ChartRenderer::new(&palette, &style);
        assert_eq!(renderer.tick_label(Month::Calendar(7)), "7");
        assert_eq!(renderer.tick_label(Month::Average), "MÉDIA");
    }

    #[test]
    fn rendering_is_reproducible() {
        if !fonts::fonts_available() {
            eprintln!("skipping chart rendering test: fonts unavailable");
            return;
        }
        let palette = BrandPalette::default();
        let style = ChartStyle::default();
        let renderer = ChartRenderer::new(&palette, &style);

        let first = renderer.render_rgb(&samples(), 60).unwrap();
        let second = renderer.render_rgb(&samples(), 60).unwrap();
        assert_eq!(first.len(), 1800 * 900 * 3);
        assert_eq!(Sha256::digest(&first), Sha256::digest(&second));

        let other = renderer.render_rgb(&samples(), 30).unwrap();
        assert_ne!(Sha256::digest(&first), Sha256::digest(&other));
    }

    #[test]
    fn render_writes_png_with_reported_dimensions() {
        if !fonts::fonts_available() {
            eprintln!("skipping chart rendering test: fonts unavailable");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let palette = BrandPalette::default();
        let style = ChartStyle::default();
        let renderer = ChartRenderer::new(&palette, &style);

        let artifact = renderer.render(&samples(), 0, dir.path()).unwrap();
        assert_eq!((artifact.pixel_width, artifact.pixel_height), (1800, 900));
        assert_eq!(image::image_dimensions(&artifact.path).unwrap(), (1800, 900));
        assert!(artifact
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("grafico_producao_")));
    }
}

//! Payback schedule rendered as a table image.

use std::path::Path;

use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::artifact::{unique_artifact_path, write_png};
use crate::error::RenderingError;
use crate::format::{format_currency_br, format_signed_currency_br, is_negative_at};
use crate::model::{PaybackYear, RenderedArtifact};
use crate::raster::{self, font, DrawResult};
use crate::style::{BrandPalette, Rgb, TableStyle};

const ARTIFACT: &str = "payback table";
const FILE_PREFIX: &str = "tabela_retorno";

/// Canvas height for `rows` data rows. Rows keep their full height however
/// many there are, so the canvas grows instead.
pub fn canvas_height(style: &TableStyle, rows: usize) -> u32 {
    let rows = u32::try_from(rows).unwrap_or(u32::MAX);
    (2 * style.padding_px + style.header_height_px)
        .saturating_add(rows.saturating_mul(style.row_height_px))
}

/// Left edge of every column followed by the right edge of the last one.
fn column_edges(style: &TableStyle) -> [i32; 5] {
    let inner = f64::from(style.width_px - 2 * style.padding_px);
    let total: u32 = style.column_weights.iter().sum();
    let mut edges = [0i32; 5];
    let mut acc = 0u32;
    for (index, edge) in edges.iter_mut().enumerate() {
        *edge = style.padding_px as i32 + (inner * f64::from(acc) / f64::from(total)).round() as i32;
        if let Some(weight) = style.column_weights.get(index) {
            acc += weight;
        }
    }
    edges
}

/// Text of the four cells of a schedule row.
pub fn row_cells(entry: &PaybackYear) -> [String; 4] {
    [
        entry.year.to_string(),
        format_signed_currency_br(entry.balance),
        format_currency_br(entry.avg_monthly_savings),
        format_currency_br(entry.annual_savings),
    ]
}

/// Red for balances that print negative, accent otherwise.
pub fn balance_color(palette: &BrandPalette, balance: f64) -> Rgb {
    if is_negative_at(balance, 2) {
        palette.negative
    } else {
        palette.accent
    }
}

pub struct TableRenderer<'a> {
    palette: &'a BrandPalette,
    style: &'a TableStyle,
}

impl<'a> TableRenderer<'a> {
    pub fn new(palette: &'a BrandPalette, style: &'a TableStyle) -> Self {
        Self { palette, style }
    }

    /// Writes the table as a uniquely named PNG inside `output_dir`.
    pub fn render(
        &self,
        schedule: &[PaybackYear],
        output_dir: &Path,
    ) -> Result<RenderedArtifact, RenderingError> {
        let height = canvas_height(self.style, schedule.len());
        let pixels = self.render_rgb(schedule)?;
        let path = unique_artifact_path(output_dir, FILE_PREFIX, "png");
        let artifact = write_png(&path, &pixels, self.style.width_px, height)?;
        debug!(
            "rendered {} with {} rows to {}",
            ARTIFACT,
            schedule.len(),
            artifact.path.display()
        );
        Ok(artifact)
    }

    pub fn render_rgb(&self, schedule: &[PaybackYear]) -> Result<Vec<u8>, RenderingError> {
        let height = canvas_height(self.style, schedule.len());
        raster::paint(ARTIFACT, self.style.width_px, height, |root| {
            self.draw(root, schedule)
        })
    }

    fn draw(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        schedule: &[PaybackYear],
    ) -> DrawResult {
        let style = self.style;
        let palette = self.palette;
        let edges = column_edges(style);
        let (left, right) = (edges[0], edges[4]);
        let pad = style.padding_px as i32;
        let header_bottom = pad + style.header_height_px as i32;
        let row_height = style.row_height_px as i32;
        let grid = raster::color(palette.neutral).mix(0.35);

        root.draw(&Rectangle::new(
            [(left, pad), (right, header_bottom)],
            raster::color(palette.primary).filled(),
        ))?;
        let header_style = font(style.header_font_px, true)
            .color(&raster::color(palette.background))
            .pos(Pos::new(HPos::Center, VPos::Center));
        for (column, title) in style.headers.iter().enumerate() {
            let center = ((edges[column] + edges[column + 1]) / 2, (pad + header_bottom) / 2);
            root.draw(&Text::new(*title, center, header_style.clone()))?;
        }

        let text_color = raster::color(palette.primary);
        for (index, entry) in schedule.iter().enumerate() {
            let top = header_bottom + index as i32 * row_height;
            let bottom = top + row_height;
            let fill = if index % 2 == 0 {
                palette.zebra
            } else {
                palette.background
            };
            root.draw(&Rectangle::new(
                [(left, top), (right, bottom)],
                raster::color(fill).filled(),
            ))?;

            let balance_rgb = balance_color(palette, entry.balance);
            for (column, text) in row_cells(entry).into_iter().enumerate() {
                let color = if column == 1 {
                    raster::color(balance_rgb)
                } else {
                    text_color
                };
                let center = ((edges[column] + edges[column + 1]) / 2, (top + bottom) / 2);
                let cell_style = font(style.cell_font_px, false)
                    .color(&color)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(text, center, cell_style))?;
            }
            root.draw(&PathElement::new(vec![(left, bottom), (right, bottom)], grid))?;
        }

        let table_bottom = header_bottom + schedule.len() as i32 * row_height;
        for edge in edges {
            root.draw(&PathElement::new(
                vec![(edge, pad), (edge, table_bottom)],
                grid,
            ))?;
        }
        root.draw(&Rectangle::new(
            [(left, pad), (right, table_bottom)],
            raster::color(palette.neutral).stroke_width(2),
        ))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts;

    fn entry(year: u32, balance: f64) -> PaybackYear {
        PaybackYear {
            year,
            balance,
            avg_monthly_savings: 1_250.5,
            annual_savings: 15_006.0,
        }
    }

    #[test]
    fn height_never_shrinks_as_rows_grow() {
        let style = TableStyle::default();
        let heights: Vec<u32> = (0..=30).map(|rows| canvas_height(&style, rows)).collect();
        assert!(heights.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(heights[0], 2 * 16 + 56);
        assert_eq!(heights[25] - heights[24], style.row_height_px);
    }

    #[test]
    fn columns_cover_the_inner_width_in_order() {
        let style = TableStyle::default();
        let edges = column_edges(&style);
        assert_eq!(edges[0], 16);
        assert_eq!(edges[4], 1600 - 16);
        assert!(edges.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn balance_cell_carries_explicit_sign() {
        let cells = row_cells(&entry(3, -12_345.678));
        assert_eq!(cells[0], "3");
        assert_eq!(cells[1], "-R$ 12.345,68");
        assert_eq!(cells[2], "R$ 1.250,50");
        assert_eq!(cells[3], "R$ 15.006,00");
        assert_eq!(row_cells(&entry(4, 150.5))[1], "R$ 150,50");
    }

    #[test]
    fn balances_rounding_to_zero_are_not_negative() {
        let palette = BrandPalette::default();
        assert_eq!(row_cells(&entry(5, -0.001))[1], "R$ 0,00");
        assert_eq!(balance_color(&palette, -0.001), palette.accent);
        assert_eq!(balance_color(&palette, -0.01), palette.negative);
        assert_eq!(balance_color(&palette, 0.0), palette.accent);
    }

    #[test]
    fn render_writes_png_sized_for_rows() {
        if !fonts::fonts_available() {
            eprintln!("skipping table rendering test: fonts unavailable");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let palette = BrandPalette::default();
        let style = TableStyle::default();
        let renderer = TableRenderer::new(&palette, &style);

        let schedule: Vec<_> = (1..=25)
            .map(|year| entry(year, -30_000.0 + 2_500.0 * f64::from(year)))
            .collect();
        let artifact = renderer.render(&schedule, dir.path()).unwrap();
        let expected = canvas_height(&style, 25);
        assert_eq!((artifact.pixel_width, artifact.pixel_height), (1600, expected));
        assert_eq!(image::image_dimensions(&artifact.path).unwrap(), (1600, expected));
    }

    #[test]
    fn empty_schedule_renders_header_only() {
        if !fonts::fonts_available() {
            eprintln!("skipping table rendering test: fonts unavailable");
            return;
        }
        let palette = BrandPalette::default();
        let style = TableStyle::default();
        let pixels = TableRenderer::new(&palette, &style).render_rgb(&[]).unwrap();
        assert_eq!(pixels.len(), (1600 * canvas_height(&style, 0) * 3) as usize);
    }
}

//! Brand palette and the fixed layout parameters of the proposal.
//!
//! All values here are plain immutable data. They are handed to each renderer
//! and to the composer explicitly; nothing reads them from global state.

use genpdf::style::Color;
use plotters::style::RGBColor;

/// An sRGB color independent of any rendering backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

    pub fn channels(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }

    /// `#RRGGBB`
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }
}

impl From<Rgb> for RGBColor {
    fn from(rgb: Rgb) -> Self {
        RGBColor(rgb.0, rgb.1, rgb.2)
    }
}

/// Brand colors shared by the charts, the payback table and the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrandPalette {
    /// Dark blue used for titles, labels and the table header.
    pub primary: Rgb,
    /// Teal used for section titles, the total-generation series and positive balances.
    pub accent: Rgb,
    /// Orange used for the cover tagline.
    pub highlight: Rgb,
    /// Gray used for grid lines and borders.
    pub neutral: Rgb,
    pub background: Rgb,
    /// Light gray behind alternate table rows.
    pub zebra: Rgb,
    /// Light tint used by the generated cover artwork.
    pub light: Rgb,
    /// Red used for negative balances.
    pub negative: Rgb,
}

impl Default for BrandPalette {
    fn default() -> Self {
        Self {
            primary: Rgb(0x2C, 0x3E, 0x50),
            accent: Rgb(0x16, 0xA0, 0x85),
            highlight: Rgb(0xE6, 0x7E, 0x22),
            neutral: Rgb(0x7F, 0x8C, 0x8D),
            background: Rgb::WHITE,
            zebra: Rgb(0xF8, 0xF9, 0xFA),
            light: Rgb(0xEC, 0xF0, 0xF1),
            negative: Rgb(0xC0, 0x39, 0x2B),
        }
    }
}

/// Parameters of the monthly production bar chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartStyle {
    pub width_px: u32,
    pub height_px: u32,
    /// Width of a single bar in category units (one category is 1.0 wide).
    pub bar_width: f64,
    pub title: &'static str,
    pub x_description: &'static str,
    pub y_description: &'static str,
    pub per_module_label: &'static str,
    pub total_label: &'static str,
    /// Tick label of the non-numeric (average) sample.
    pub average_label: &'static str,
    pub title_font_px: f64,
    pub label_font_px: f64,
    pub value_font_px: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width_px: 1800,
            height_px: 900,
            bar_width: 0.35,
            title: "PRODUÇÃO DE ENERGIA",
            x_description: "MÊS",
            y_description: "GERAÇÃO",
            per_module_label: "geração por placa",
            total_label: "geração total estimada",
            average_label: "MÉDIA",
            title_font_px: 40.0,
            label_font_px: 24.0,
            value_font_px: 17.0,
        }
    }
}

/// Parameters of the payback schedule table raster.
#[derive(Clone, Debug, PartialEq)]
pub struct TableStyle {
    pub width_px: u32,
    pub header_height_px: u32,
    /// Height of each data row; never compressed below this.
    pub row_height_px: u32,
    pub padding_px: u32,
    pub column_weights: [u32; 4],
    pub headers: [&'static str; 4],
    pub header_font_px: f64,
    pub cell_font_px: f64,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            width_px: 1600,
            header_height_px: 56,
            row_height_px: 46,
            padding_px: 16,
            column_weights: [10, 22, 26, 22],
            headers: ["ANO", "SALDO", "ECONOMIA MÉDIA MENSAL", "ECONOMIA ANUAL"],
            header_font_px: 22.0,
            cell_font_px: 22.0,
        }
    }
}

/// Page geometry of the composed document, in millimetres.
#[derive(Clone, Debug, PartialEq)]
pub struct PageLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
    /// Band reserved at the top of content pages for the brand mark and title.
    pub header_height_mm: f64,
    /// Band reserved at the bottom of content pages for the rule and page number.
    pub footer_height_mm: f64,
    /// Height of the logo inside the header band.
    pub logo_height_mm: f64,
    /// Distance from the top of the cover to the client name block.
    pub cover_client_offset_mm: f64,
    pub chart_width_mm: f64,
    pub table_width_mm: f64,
    /// Used when the payback table's proportions cannot be read.
    pub table_fallback_height_mm: f64,
    pub body_font_size: u8,
    pub line_spacing: f64,
}

impl PageLayout {
    /// Height available to flowing content on a content page.
    pub fn content_frame_height_mm(&self) -> f64 {
        self.page_height_mm - 2.0 * self.margin_mm - self.header_height_mm - self.footer_height_mm
    }

    pub fn content_frame_width_mm(&self) -> f64 {
        self.page_width_mm - 2.0 * self.margin_mm
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 20.0,
            header_height_mm: 18.0,
            footer_height_mm: 14.0,
            logo_height_mm: 10.0,
            cover_client_offset_mm: 205.0,
            chart_width_mm: 160.0,
            table_width_mm: 160.0,
            table_fallback_height_mm: 180.0,
            body_font_size: 10,
            line_spacing: 1.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_converts_to_backend_colors() {
        let palette = BrandPalette::default();
        assert_eq!(Color::from(palette.accent), Color::Rgb(0x16, 0xA0, 0x85));
        assert_eq!(RGBColor::from(palette.primary), RGBColor(0x2C, 0x3E, 0x50));
        assert_eq!(palette.accent.to_hex(), "#16A085");
    }

    #[test]
    fn content_frame_excludes_margins_and_bands() {
        let layout = PageLayout::default();
        assert_eq!(layout.content_frame_height_mm(), 297.0 - 40.0 - 18.0 - 14.0);
        assert_eq!(layout.content_frame_width_mm(), 170.0);
        assert!(layout.table_width_mm <= layout.content_frame_width_mm());
    }
}

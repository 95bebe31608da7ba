//! Shared plumbing of the raster renderers: font registration with `plotters`,
//! the in-memory RGB canvas and text styles.

use std::error::Error;
use std::sync::OnceLock;

use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontDesc, FontFamily, FontStyle};

use crate::error::RenderingError;
use crate::fonts;
use crate::style::Rgb;

pub(crate) type DrawResult = Result<(), Box<dyn Error>>;

const FAMILY_NAME: &str = "sans-serif";

static REGISTRATION: OnceLock<Result<(), &'static str>> = OnceLock::new();

/// Registers the shared font bytes as the `sans-serif` family of `plotters`.
///
/// Registration happens once per process. Font lookup failures are retried on
/// the next call since nothing is registered in that case.
pub(crate) fn ensure_fonts() -> Result<(), RenderingError> {
    if let Some(outcome) = REGISTRATION.get() {
        return (*outcome).map_err(|family| RenderingError::FontRegistration { family });
    }

    let assets = fonts::font_assets()?;
    let outcome = REGISTRATION.get_or_init(|| {
        debug!("registering '{}' for raster text", assets.family_name);
        register_font(FAMILY_NAME, FontStyle::Normal, assets.regular)
            .map_err(|_| "sans-serif regular")?;
        register_font(FAMILY_NAME, FontStyle::Bold, assets.bold).map_err(|_| "sans-serif bold")?;
        Ok(())
    });
    (*outcome).map_err(|family| RenderingError::FontRegistration { family })
}

pub(crate) fn font(size_px: f64, bold: bool) -> FontDesc<'static> {
    let style = if bold {
        FontStyle::Bold
    } else {
        FontStyle::Normal
    };
    FontDesc::new(FontFamily::SansSerif, size_px, style)
}

pub(crate) fn color(rgb: Rgb) -> RGBColor {
    rgb.into()
}

/// Draws onto a white-filled `width` x `height` canvas and returns its RGB bytes.
pub(crate) fn paint<F>(
    artifact: &'static str,
    width: u32,
    height: u32,
    draw: F,
) -> Result<Vec<u8>, RenderingError>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    ensure_fonts()?;

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|err| RenderingError::draw(artifact, err))?;
        draw(&root).map_err(|err| RenderingError::draw(artifact, err))?;
        root.present()
            .map_err(|err| RenderingError::draw(artifact, err))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_fills_white_background() {
        if !fonts::fonts_available() {
            eprintln!("skipping raster test: fonts unavailable");
            return;
        }
        let buffer = paint("probe", 4, 3, |_| Ok(())).unwrap();
        assert_eq!(buffer.len(), 4 * 3 * 3);
        assert!(buffer.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn paint_wraps_drawing_failures() {
        if !fonts::fonts_available() {
            eprintln!("skipping raster test: fonts unavailable");
            return;
        }
        let err = paint("probe", 2, 2, |_| Err("boom".into())).unwrap_err();
        assert!(matches!(err, RenderingError::Draw { artifact: "probe", .. }));
        assert!(err.to_string().contains("boom"));
    }
}

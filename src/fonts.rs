//! Font discovery shared by the document composer and the raster renderers.
//!
//! The bundled Roboto family is searched first; when it is missing the platform
//! fallback family is used instead. Font bytes are loaded once per process and
//! kept for its lifetime so both `genpdf` and `plotters` can borrow them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};
use thiserror::Error;

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Overrides the bundled font directory.
pub const FONTS_DIR_ENV: &str = "SOLAR_PROPOSAL_FONTS_DIR";

/// Overrides the directory searched for the platform fallback family.
pub const SYSTEM_FONTS_DIR_ENV: &str = "SOLAR_PROPOSAL_SYSTEM_FONTS_DIR";

/// File names of one family, in regular/bold/italic/bold-italic order.
struct FamilyFiles {
    name: &'static str,
    files: [&'static str; 4],
}

const BUNDLED_FAMILY: FamilyFiles = FamilyFiles {
    name: DEFAULT_FONT_FAMILY_NAME,
    files: [
        "Roboto-Regular.ttf",
        "Roboto-Bold.ttf",
        "Roboto-Italic.ttf",
        "Roboto-BoldItalic.ttf",
    ],
};

#[cfg(windows)]
const FALLBACK_FAMILY: FamilyFiles = FamilyFiles {
    name: "Arial",
    files: ["arial.ttf", "arialbd.ttf", "ariali.ttf", "arialbi.ttf"],
};

#[cfg(not(windows))]
const FALLBACK_FAMILY: FamilyFiles = FamilyFiles {
    name: "DejaVu Sans",
    files: [
        "DejaVuSans.ttf",
        "DejaVuSans-Bold.ttf",
        "DejaVuSans-Oblique.ttf",
        "DejaVuSans-BoldOblique.ttf",
    ],
};

/// Font lookup failures.
#[derive(Clone, Debug, Error)]
pub enum FontError {
    #[error("no usable font family found; checked: {checked}. Set SOLAR_PROPOSAL_FONTS_DIR or install the bundled fonts under assets/fonts")]
    NotFound { checked: String },
    #[error("failed to read font {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
}

/// Raw bytes of a loaded font family.
#[derive(Debug)]
pub struct FontAssets {
    pub family_name: &'static str,
    pub regular: &'static [u8],
    pub bold: &'static [u8],
    pub italic: &'static [u8],
    pub bold_italic: &'static [u8],
}

static FONT_ASSETS: OnceLock<FontAssets> = OnceLock::new();

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn push_unique(candidates: &mut Vec<PathBuf>, candidate: PathBuf) {
    if !candidates.iter().any(|existing| existing == &candidate) {
        candidates.push(candidate);
    }
}

fn bundled_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        candidates.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push_unique(&mut candidates, bin_dir.join("assets/fonts"));
        }
    }

    push_unique(
        &mut candidates,
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"),
    );
    candidates
}

fn fallback_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = env_path(SYSTEM_FONTS_DIR_ENV) {
        candidates.push(path);
    }

    #[cfg(windows)]
    {
        for var in ["WINDIR", "SystemRoot"] {
            if let Some(root) = env_path(var) {
                push_unique(&mut candidates, root.join("Fonts"));
            }
        }
    }

    #[cfg(not(windows))]
    {
        for dir in [
            "/usr/share/fonts/truetype/dejavu",
            "/usr/share/fonts/dejavu",
            "/usr/share/fonts/TTF",
            "/usr/local/share/fonts",
        ] {
            push_unique(&mut candidates, PathBuf::from(dir));
        }
    }

    candidates
}

fn missing_files(directory: &Path, family: &FamilyFiles) -> Vec<&'static str> {
    family
        .files
        .iter()
        .copied()
        .filter(|name| !directory.join(name).is_file())
        .collect()
}

fn locate(
    family: &FamilyFiles,
    candidates: Vec<PathBuf>,
    attempts: &mut Vec<String>,
) -> Option<PathBuf> {
    for candidate in candidates {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }
        let missing = missing_files(&candidate, family);
        if missing.is_empty() {
            return Some(candidate);
        }
        attempts.push(format!(
            "{} (missing {} files [{}])",
            candidate.display(),
            family.name,
            missing.join(", ")
        ));
    }
    None
}

fn read_leaked(path: PathBuf) -> Result<&'static [u8], FontError> {
    let bytes = fs::read(&path).map_err(|err| FontError::Unreadable {
        message: err.to_string(),
        path,
    })?;
    Ok(Box::leak(bytes.into_boxed_slice()))
}

fn load_family(directory: &Path, family: &FamilyFiles) -> Result<FontAssets, FontError> {
    let [regular, bold, italic, bold_italic] = family.files;
    Ok(FontAssets {
        family_name: family.name,
        regular: read_leaked(directory.join(regular))?,
        bold: read_leaked(directory.join(bold))?,
        italic: read_leaked(directory.join(italic))?,
        bold_italic: read_leaked(directory.join(bold_italic))?,
    })
}

fn resolve_font_assets() -> Result<FontAssets, FontError> {
    let mut attempts = Vec::new();

    if let Some(directory) =
        locate(&BUNDLED_FAMILY, bundled_directory_candidates(), &mut attempts)
    {
        debug!("loading bundled fonts from {}", directory.display());
        return load_family(&directory, &BUNDLED_FAMILY);
    }

    if let Some(directory) =
        locate(&FALLBACK_FAMILY, fallback_directory_candidates(), &mut attempts)
    {
        warn!(
            "Bundled {} fonts unavailable; falling back to '{}' from {}",
            DEFAULT_FONT_FAMILY_NAME,
            FALLBACK_FAMILY.name,
            directory.display()
        );
        return load_family(&directory, &FALLBACK_FAMILY);
    }

    let checked = if attempts.is_empty() {
        "no search paths were available".to_owned()
    } else {
        attempts.join(", ")
    };
    Err(FontError::NotFound { checked })
}

/// Returns the process-wide font bytes, loading them on first use.
///
/// Failed lookups are not cached, so installing fonts later makes the next call
/// succeed.
pub fn font_assets() -> Result<&'static FontAssets, FontError> {
    if let Some(assets) = FONT_ASSETS.get() {
        return Ok(assets);
    }
    let loaded = resolve_font_assets()?;
    Ok(FONT_ASSETS.get_or_init(|| loaded))
}

/// Builds a `genpdf` font family from the shared font bytes.
pub fn document_font_family(
    assets: &FontAssets,
) -> Result<FontFamily<FontData>, genpdf::error::Error> {
    Ok(FontFamily {
        regular: FontData::new(assets.regular.to_vec(), None)?,
        bold: FontData::new(assets.bold.to_vec(), None)?,
        italic: FontData::new(assets.italic.to_vec(), None)?,
        bold_italic: FontData::new(assets.bold_italic.to_vec(), None)?,
    })
}

/// Indicates whether a usable font family can be found.
pub fn fonts_available() -> bool {
    font_assets().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_reported() {
        let mut attempts = Vec::new();
        let found = locate(
            &BUNDLED_FAMILY,
            vec![PathBuf::from("/__solar_proposal_missing_fonts__")],
            &mut attempts,
        );
        assert!(found.is_none());
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].contains("directory missing"));
    }

    #[test]
    fn incomplete_directory_lists_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Roboto-Regular.ttf"), b"not a font").unwrap();

        let mut attempts = Vec::new();
        let found = locate(&BUNDLED_FAMILY, vec![dir.path().to_path_buf()], &mut attempts);
        assert!(found.is_none());
        assert!(attempts[0].contains("Roboto-Bold.ttf"));
        assert!(!attempts[0].contains("Roboto-Regular.ttf"));
    }

    #[test]
    fn complete_directory_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        for name in BUNDLED_FAMILY.files {
            fs::write(dir.path().join(name), b"font").unwrap();
        }

        let mut attempts = Vec::new();
        let found = locate(&BUNDLED_FAMILY, vec![dir.path().to_path_buf()], &mut attempts);
        assert_eq!(found.as_deref(), Some(dir.path()));
        assert!(attempts.is_empty());
    }
}

//! Scratch files produced while a single proposal is built.
//!
//! Every file name carries a random token so builds sharing one directory never
//! collide. Rasters are wrapped in an [`ArtifactGuard`] that deletes the file
//! when the build is done, whichever way it ends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use uuid::Uuid;

use crate::error::ArtifactIoError;
use crate::model::RenderedArtifact;

/// Eight lowercase hex characters drawn from a fresh v4 UUID.
pub fn unique_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(8);
    token
}

/// `<dir>/<prefix>_<token>.<extension>`
pub fn unique_artifact_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.{extension}", unique_token()))
}

/// Creates `dir` (and its parents) if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), ArtifactIoError> {
    fs::create_dir_all(dir).map_err(|source| ArtifactIoError::Directory {
        path: dir.to_path_buf(),
        source,
    })
}

/// Encodes an RGB buffer as PNG at `path`.
///
/// A partially written file is removed before the error is returned.
pub fn write_png(
    path: &Path,
    rgb: &[u8],
    width: u32,
    height: u32,
) -> Result<RenderedArtifact, ArtifactIoError> {
    if let Err(source) = image::save_buffer(path, rgb, width, height, image::ColorType::Rgb8) {
        let _ = fs::remove_file(path);
        return Err(ArtifactIoError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!("wrote {}x{} raster {}", width, height, path.display());
    Ok(RenderedArtifact {
        path: path.to_path_buf(),
        pixel_width: width,
        pixel_height: height,
    })
}

/// Deletes `path`; a file that is already gone counts as removed.
pub fn remove_artifact(path: &Path) -> Result<(), ArtifactIoError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ArtifactIoError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Owns a rendered artifact for the duration of one build.
///
/// [`release`](Self::release) deletes the file and reports the outcome. A guard
/// dropped without being released (an early return on a failed build) deletes
/// the file on a best-effort basis and logs failures.
#[derive(Debug)]
pub struct ArtifactGuard {
    artifact: Option<RenderedArtifact>,
}

impl ArtifactGuard {
    pub fn new(artifact: RenderedArtifact) -> Self {
        Self {
            artifact: Some(artifact),
        }
    }

    pub fn artifact(&self) -> Option<&RenderedArtifact> {
        self.artifact.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.artifact.as_ref().map(|artifact| artifact.path.as_path())
    }

    /// Deletes the artifact now.
    pub fn release(mut self) -> Result<(), ArtifactIoError> {
        match self.artifact.take() {
            Some(artifact) => remove_artifact(&artifact.path),
            None => Ok(()),
        }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            if let Err(err) = remove_artifact(&artifact.path) {
                warn!("{err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact_at(path: PathBuf) -> RenderedArtifact {
        RenderedArtifact {
            path,
            pixel_width: 1,
            pixel_height: 1,
        }
    }

    #[test]
    fn tokens_are_short_hex_and_distinct() {
        let a = unique_token();
        let b = unique_token();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn artifact_path_uses_prefix_and_extension() {
        let path = unique_artifact_path(Path::new("/tmp/out"), "grafico_producao", "png");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("grafico_producao_"));
        assert!(name.ends_with(".png"));
        assert_eq!(path.parent(), Some(Path::new("/tmp/out")));
    }

    #[test]
    fn write_png_reports_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let artifact = write_png(&path, &[10, 20, 30, 40, 50, 60], 2, 1).unwrap();
        assert_eq!((artifact.pixel_width, artifact.pixel_height), (2, 1));
        assert_eq!(image::image_dimensions(&path).unwrap(), (2, 1));
    }

    #[test]
    fn write_png_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("pixel.png");
        let err = write_png(&path, &[0, 0, 0], 1, 1).unwrap_err();
        assert!(matches!(err, ArtifactIoError::Write { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn guard_release_deletes_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"x").unwrap();

        ArtifactGuard::new(artifact_at(path.clone())).release().unwrap();
        assert!(!path.exists());

        ArtifactGuard::new(artifact_at(path.clone())).release().unwrap();
    }

    #[test]
    fn dropped_guard_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.png");
        fs::write(&path, b"x").unwrap();
        {
            let guard = ArtifactGuard::new(artifact_at(path.clone()));
            assert_eq!(guard.path(), Some(path.as_path()));
        }
        assert!(!path.exists());
    }

    #[test]
    fn failed_release_reports_the_remove_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.png");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();

        let err = ArtifactGuard::new(artifact_at(path.clone()))
            .release()
            .unwrap_err();
        match err {
            ArtifactIoError::Remove {
                path: reported, ..
            } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
        assert!(path.is_dir());
    }

    #[test]
    fn dropped_guard_only_logs_remove_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.png");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();

        drop(ArtifactGuard::new(artifact_at(path.clone())));
        assert!(path.join("inner").exists());
    }
}

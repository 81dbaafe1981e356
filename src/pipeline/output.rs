//! Artifact placement: where a report goes and how it is written.
//!
//! Reports land next to the input photo as `<stem>_solution.png` or
//! `<stem>_feedback.png`. Downloaded and in-memory inputs have no directory
//! of their own, so they go to `output_dir` (or the working directory).

use crate::error::MathSnapError;
use crate::pipeline::dispatch::Marker;
use crate::pipeline::input::InputOrigin;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Report path for `origin` in `marker` mode, or `None` for [`Marker::None`].
pub fn derive_output_path(
    origin: &InputOrigin,
    marker: Marker,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    let suffix = marker.artifact_suffix()?;

    let (dir, name) = match origin {
        InputOrigin::Local(path) => {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf);
            (
                output_dir.map(Path::to_path_buf).or(parent),
                path.as_path(),
            )
        }
        InputOrigin::Remote { file_name, .. } => {
            (output_dir.map(Path::to_path_buf), Path::new(file_name.as_str()))
        }
        InputOrigin::Memory { name } => (output_dir.map(Path::to_path_buf), Path::new(name.as_str())),
    };

    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    let file = format!("{stem}_{suffix}.png");

    Some(match dir {
        Some(d) => d.join(file),
        None => PathBuf::from(file),
    })
}

/// Write `bytes` to `path` via a uniquely named sibling temp file and a
/// rename, so readers never observe a half-written PNG.
///
/// Each call gets its own temp file, so concurrent runs targeting the same
/// report path never share a half-written file; the last rename wins.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MathSnapError> {
    let fail = |e| MathSnapError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    tokio::fs::create_dir_all(&parent).await.map_err(fail)?;

    let target = path.to_path_buf();
    let data = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".mathsnap-")
            .suffix(".png.tmp")
            .tempfile_in(&parent)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        // On failure the temp file is dropped and removed.
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| MathSnapError::Internal(format!("write task panicked: {}", e)))?
    .map_err(fail)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_report_sits_next_to_input() {
        let origin = InputOrigin::Local(PathBuf::from("/hw/page1.jpg"));
        assert_eq!(
            derive_output_path(&origin, Marker::Solve, None),
            Some(PathBuf::from("/hw/page1_solution.png"))
        );
        assert_eq!(
            derive_output_path(&origin, Marker::Check, None),
            Some(PathBuf::from("/hw/page1_feedback.png"))
        );
    }

    #[test]
    fn no_marker_means_no_path() {
        let origin = InputOrigin::Local(PathBuf::from("/hw/page1.jpg"));
        assert_eq!(derive_output_path(&origin, Marker::None, None), None);
    }

    #[test]
    fn bare_filename_stays_relative() {
        let origin = InputOrigin::Local(PathBuf::from("eq.png"));
        assert_eq!(
            derive_output_path(&origin, Marker::Solve, None),
            Some(PathBuf::from("eq_solution.png"))
        );
    }

    #[test]
    fn output_dir_overrides_location() {
        let origin = InputOrigin::Remote {
            url: "https://x.org/a/hw.png".into(),
            file_name: "hw.png".into(),
        };
        assert_eq!(
            derive_output_path(&origin, Marker::Check, Some(Path::new("/out"))),
            Some(PathBuf::from("/out/hw_feedback.png"))
        );
        let mem = InputOrigin::Memory { name: String::new() };
        assert_eq!(
            derive_output_path(&mem, Marker::Solve, None),
            Some(PathBuf::from("image_solution.png"))
        );
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("x_solution.png");
        write_atomic(&path, b"png").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_path_never_mix_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hw_solution.png");
        let long = vec![b'L'; 256 * 1024];
        let short = vec![b's'; 16];

        let (a, b) = tokio::join!(write_atomic(&path, &long), write_atomic(&path, &short));
        a.unwrap();
        b.unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(written == long || written == short, "mixed {} bytes", written.len());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn unwritable_target_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = write_atomic(&blocker.join("out.png"), b"png").await.unwrap_err();
        assert!(matches!(err, MathSnapError::OutputWriteFailed { .. }));
    }
}

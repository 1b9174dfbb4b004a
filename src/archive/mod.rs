//! Release archive extraction.
//!
//! Dependencies are published as `.zip`, `.tgz` or `.tar.gz` archives. The
//! [`Extractor`] trait is the seam the resolver uses; [`ArchiveExtractor`]
//! is the real implementation, built on the `zip` crate and on `flate2` +
//! `tar`.
//!
//! Every entry is checked before it is written: a name that would land
//! outside the destination (`../x`, `/etc/passwd`) aborts extraction with
//! [`BzError::UnsafeArchiveEntry`]. Unix permission bits stored in the
//! archive are applied so shipped executables stay executable.

use crate::core::BzError;
use crate::utils::fs::{ensure_dir, is_safe_path};
use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;

/// Unpacks a downloaded archive into a directory.
pub trait Extractor: Send + Sync {
    /// Extracts `archive` into `dest`, creating `dest` if needed.
    ///
    /// # Errors
    ///
    /// Must fail with [`BzError::UnsafeArchiveEntry`] when an entry escapes
    /// `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Archive formats bz understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Determines the archive kind from the file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Extracts zip and gzip'd tar archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let kind = ArchiveKind::from_path(archive).ok_or_else(|| BzError::UnsupportedArchive {
            file: archive.display().to_string(),
        })?;

        tracing::info!("Extracting {} into {}", archive.display(), dest.display());
        ensure_dir(dest)?;

        let result = match kind {
            ArchiveKind::Zip => extract_zip(archive, dest),
            ArchiveKind::TarGz => extract_tar_gz(archive, dest),
        };

        result.map_err(|e| {
            if e.downcast_ref::<BzError>().is_some() {
                e
            } else {
                BzError::ExtractionFailed {
                    file: archive.display().to_string(),
                    reason: format!("{e:#}"),
                }
                .into()
            }
        })
    }
}

fn unsafe_entry(entry: &str, dest: &Path) -> anyhow::Error {
    BzError::UnsafeArchiveEntry {
        entry: entry.to_string(),
        dest: dest.display().to_string(),
    }
    .into()
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).context("Not a valid zip archive")?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = entry.name().to_string();

        let relative = match entry.enclosed_name() {
            Some(path) if is_safe_path(dest, &path) => path,
            _ => return Err(unsafe_entry(&name, dest)),
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            ensure_dir(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        let mut out = File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }

    Ok(())
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));

    for entry in tar.entries().context("Failed to read tar entries")? {
        let mut entry = entry.context("Corrupt tar entry")?;
        let name = entry.path_bytes().into_owned();
        let name = String::from_utf8_lossy(&name).into_owned();

        if !is_safe_path(dest, Path::new(&name)) {
            return Err(unsafe_entry(&name, dest));
        }

        // unpack_in refuses paths with `..` and reports it as `false`
        let unpacked =
            entry.unpack_in(dest).with_context(|| format!("Failed to unpack entry {name}"))?;
        if !unpacked {
            return Err(unsafe_entry(&name, dest));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{ArchiveFixture, raw_tgz};
    use tempfile::TempDir;

    #[test]
    fn test_archive_kind() {
        assert_eq!(ArchiveKind::from_path(Path::new("a/tool.zip")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_path(Path::new("tool.TGZ")), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_path(Path::new("tool-v1.tar.gz")), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_path(Path::new("tool.tar")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("tool.gz")), None);
    }

    #[test]
    fn test_extract_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.zip");
        ArchiveFixture::new()
            .file(".bz.lock", "{}")
            .executable("bin/tool", "#!/bin/sh\necho hi\n")
            .write_zip(&archive)
            .unwrap();

        let dest = temp.path().join("extracted");
        ArchiveExtractor.extract(&archive, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join(".bz.lock")).unwrap(), "{}");
        assert!(dest.join("bin/tool").is_file());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dest.join("bin/tool")).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0, "executable bit should be preserved");
        }
    }

    #[test]
    fn test_extract_tgz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.gz");
        ArchiveFixture::new()
            .file(".bz.lock", "{\"env\":{\"A\":\"1\"}}")
            .executable("bin/tool", "#!/bin/sh\n")
            .write_tgz(&archive)
            .unwrap();

        let dest = temp.path().join("extracted");
        ArchiveExtractor.extract(&archive, &dest).unwrap();

        assert!(std::fs::read_to_string(dest.join(".bz.lock")).unwrap().contains("\"A\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dest.join("bin/tool")).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.rar");
        std::fs::write(&archive, "x").unwrap();

        let err = ArchiveExtractor.extract(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err.downcast_ref::<BzError>(), Some(BzError::UnsupportedArchive { .. })));
    }

    #[test]
    fn test_zip_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        ArchiveFixture::new().file("../escaped.txt", "gotcha").write_zip(&archive).unwrap();

        let dest = temp.path().join("sub").join("extracted");
        let err = ArchiveExtractor.extract(&archive, &dest).unwrap_err();
        assert!(matches!(err.downcast_ref::<BzError>(), Some(BzError::UnsafeArchiveEntry { .. })));
        assert!(!temp.path().join("sub").join("escaped.txt").exists());
    }

    #[test]
    fn test_tgz_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tgz");
        raw_tgz(&archive, &[("../escaped.txt", b"gotcha".as_slice())]).unwrap();

        let dest = temp.path().join("sub").join("extracted");
        let err = ArchiveExtractor.extract(&archive, &dest).unwrap_err();
        assert!(matches!(err.downcast_ref::<BzError>(), Some(BzError::UnsafeArchiveEntry { .. })));
        assert!(!temp.path().join("sub").join("escaped.txt").exists());
    }

    #[test]
    fn test_corrupt_archive_is_extraction_failure() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        std::fs::write(&archive, "definitely not a zip").unwrap();

        let err = ArchiveExtractor.extract(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err.downcast_ref::<BzError>(), Some(BzError::ExtractionFailed { .. })));
    }
}

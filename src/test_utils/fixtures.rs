//! Archive fixtures for fake releases.

use crate::lockfile::LockedConfigContent;
use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    content: Vec<u8>,
    mode: u32,
}

/// Builder for release archives.
///
/// ```rust,no_run
/// use bz_cli::test_utils::ArchiveFixture;
/// # fn example(path: &std::path::Path) -> anyhow::Result<()> {
/// ArchiveFixture::new()
///     .file(".bz.lock", "{}")
///     .executable("bin/hello", "#!/bin/sh\necho hello\n")
///     .write_zip(path)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ArchiveFixture {
    entries: Vec<Entry>,
}

impl ArchiveFixture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entry(name, content, 0o644)
    }

    #[must_use]
    pub fn executable(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entry(name, content, 0o755)
    }

    /// Adds a `.bz.lock` at the archive root.
    ///
    /// # Panics
    ///
    /// Panics if the content cannot be serialized.
    #[must_use]
    pub fn lock(self, content: &LockedConfigContent) -> Self {
        let json = serde_json::to_string_pretty(content).expect("lock content serializes");
        self.file(crate::constants::LOCK_FILE_NAME, json)
    }

    fn entry(mut self, name: &str, content: impl AsRef<[u8]>, mode: u32) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            content: content.as_ref().to_vec(),
            mode,
        });
        self
    }

    pub fn write_zip(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut zip = zip::ZipWriter::new(file);

        for entry in &self.entries {
            let options = zip::write::SimpleFileOptions::default().unix_permissions(entry.mode);
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.content)?;
        }
        zip.finish()?;
        Ok(())
    }

    pub fn write_tgz(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        for entry in &self.entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(entry.content.len() as u64);
            header.set_mode(entry.mode);
            header.set_entry_type(tar::EntryType::Regular);
            builder.append_data(&mut header, &entry.name, entry.content.as_slice())?;
        }

        builder.into_inner()?.finish()?;
        Ok(())
    }
}

/// Writes a gzip'd tar whose entry names are stored verbatim, bypassing the
/// path checks `tar::Builder` applies. Used to build traversal archives.
pub fn raw_tgz(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for (name, content) in entries {
        let mut header = tar::Header::new_old();
        let bytes = name.as_bytes();
        header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *content)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

//! In-place patching of the target model file.
//!
//! Generated records go into three sections: bedding coefficients after the
//! tail section, stiffness definitions before it, support elements at the end
//! of the element section. Missing optional sections are created, a new
//! stiffness section with the default material block. Section
//! positions are located again after every insertion, the buffer is written
//! back once.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, error, info, warn};
use slab_text::{CLOSE_MARKER, Document, SectionKind};

use crate::error::{IoError, Result};
use crate::records::{
    DEFAULT_MATERIAL_BLOCK, DEFAULT_MATERIAL_ID, GeneratedRecords, PatchInput,
};

/// Timestamp format of backup file names.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Copy the file to `<path>.backup_<timestamp>` before touching it
    pub backup: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self { backup: true }
    }
}

/// What a successful patch changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
    pub stiffness_records: usize,
    pub support_records: usize,
    pub bedding_records: usize,
    pub stiffness_ids: Option<RangeInclusive<i32>>,
    /// Optional sections that did not exist and were created
    pub created_sections: Vec<SectionKind>,
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Patched: {}", self.path.display())?;
        match &self.backup {
            Some(backup) => writeln!(f, "Backup: {}", backup.display())?,
            None => writeln!(f, "Backup: none")?,
        }
        write!(f, "Stiffness records: {}", self.stiffness_records)?;
        if let Some(ids) = &self.stiffness_ids {
            write!(f, " (ids {}..{})", ids.start(), ids.end())?;
        }
        writeln!(f)?;
        writeln!(f, "Support elements: {}", self.support_records)?;
        writeln!(f, "Bedding records: {}", self.bedding_records)?;
        for kind in &self.created_sections {
            writeln!(f, "Created section: {kind}")?;
        }
        Ok(())
    }
}

/// Writes generated stiffness, support and bedding records into a target file.
#[derive(Debug, Clone, Default)]
pub struct Patcher {
    options: PatchOptions,
}

impl Patcher {
    pub fn new(options: PatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Patch the file at `path` with the records derived from `input`.
    ///
    /// Argument problems are returned as they are; anything failing once the
    /// file is being processed comes back as [`IoError::WriteFailed`].
    pub fn write(&self, path: impl AsRef<Path>, input: &PatchInput<'_>) -> Result<PatchOutcome> {
        let path = path.as_ref();
        check_arguments(path, input)?;

        self.apply(path, input).map_err(|source| {
            error!("patching {} failed: {source}", path.display());
            IoError::WriteFailed {
                path: path.to_path_buf(),
                source: Box::new(source),
            }
        })
    }

    fn apply(&self, path: &Path, input: &PatchInput<'_>) -> Result<PatchOutcome> {
        let backup = if self.options.backup {
            let backup = create_backup(path)?;
            info!("created backup {}", backup.display());
            Some(backup)
        } else {
            None
        };

        let mut document = Document::read(path)?;
        let map = document.locate()?;
        // A created stiffness section starts with the default material block.
        let last_id = match map.stiffness {
            Some(_) => map.max_stiffness_id(&document.text_lines()),
            None => DEFAULT_MATERIAL_ID,
        };
        let records = GeneratedRecords::generate(input, last_id)?;
        if records.is_empty() {
            warn!("no stiffness or bedding records to write");
        }

        let mut created_sections = Vec::new();

        if records.bedding.is_empty() {
            debug!("no bedding records");
        } else {
            let map = document.locate()?;
            match map.bedding {
                Some(section) => document.insert_lines(section.append_anchor() + 1, &records.bedding),
                None => {
                    document.insert_lines(
                        map.bedding_anchor() + 1,
                        delimited(SectionKind::Bedding, &records.bedding),
                    );
                    created_sections.push(SectionKind::Bedding);
                }
            }
        }

        if records.stiffness.is_empty() {
            debug!("no stiffness records");
        } else {
            let map = document.locate()?;
            match map.stiffness_anchor() {
                Some(anchor) => document.insert_lines(anchor + 1, &records.stiffness),
                None => {
                    let body: Vec<String> = DEFAULT_MATERIAL_BLOCK
                        .iter()
                        .map(|line| line.to_string())
                        .chain(records.stiffness.iter().cloned())
                        .collect();
                    document.insert_lines(map.tail.start, delimited(SectionKind::Stiffness, &body));
                    created_sections.push(SectionKind::Stiffness);
                }
            }

            let map = document.locate()?;
            document.insert_lines(map.support_anchor() + 1, &records.supports);
        }

        // The patched buffer must still have a valid section layout.
        document.locate()?;
        document.write(path)?;

        let outcome = PatchOutcome {
            path: path.to_path_buf(),
            backup,
            stiffness_records: records.stiffness.len(),
            support_records: records.supports.len(),
            bedding_records: records.bedding.len(),
            stiffness_ids: records.stiffness_ids,
            created_sections,
        };
        info!(
            "wrote {} stiffness, {} support and {} bedding records to {}",
            outcome.stiffness_records,
            outcome.support_records,
            outcome.bedding_records,
            path.display()
        );
        Ok(outcome)
    }
}

fn check_arguments(path: &Path, input: &PatchInput<'_>) -> Result<()> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(IoError::InvalidArgument("target file path is empty".into()));
    }
    if input.source.nodes.is_empty() {
        return Err(IoError::InvalidArgument("source model has no nodes".into()));
    }
    if input.source.elements.is_empty() {
        return Err(IoError::InvalidArgument("source model has no elements".into()));
    }
    if !path.is_file() {
        return Err(IoError::FileNotFound(path.to_path_buf()));
    }

    let nodes = &input.output.nodes;
    if nodes.matched_count() == 0 {
        return Err(IoError::NoCorrelatedNodes);
    }
    if nodes.unmatched_count() > 0 {
        warn!(
            "{} source nodes have no target node and get no support",
            nodes.unmatched_count()
        );
    }
    Ok(())
}

fn delimited<'a>(kind: SectionKind, body: &'a [String]) -> impl Iterator<Item = String> + 'a {
    std::iter::once(kind.opening())
        .chain(body.iter().cloned())
        .chain(std::iter::once(CLOSE_MARKER.to_string()))
}

/// Backup path for `path` with the given timestamp, suffixed `_1`, `_2`, ...
/// when an earlier backup already took the name.
pub fn backup_path_for(path: &Path, stamp: &str) -> PathBuf {
    let mut base = OsString::from(path.as_os_str());
    base.push(format!(".backup_{stamp}"));
    let candidate = PathBuf::from(&base);
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| {
            let mut name = base.clone();
            name.push(format!("_{n}"));
            PathBuf::from(name)
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Copy `path` to a timestamped sibling and return the copy's path.
pub fn create_backup(path: &Path) -> io::Result<PathBuf> {
    let stamp = Local::now().format(BACKUP_STAMP_FORMAT).to_string();
    let backup = backup_path_for(path, &stamp);
    fs::copy(path, &backup)?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_names_never_collide() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("model.txt");
        fs::write(&target, "x").expect("write target");

        let first = backup_path_for(&target, "20240101_120000");
        assert_eq!(
            first.file_name().and_then(|n| n.to_str()),
            Some("model.txt.backup_20240101_120000")
        );
        fs::write(&first, "old").expect("write backup");

        let second = backup_path_for(&target, "20240101_120000");
        assert_eq!(
            second.file_name().and_then(|n| n.to_str()),
            Some("model.txt.backup_20240101_120000_1")
        );
        fs::write(&second, "older").expect("write backup");

        let third = backup_path_for(&target, "20240101_120000");
        assert!(third.to_string_lossy().ends_with("_2"));
    }

    #[test]
    fn backup_copies_bytes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("model.txt");
        fs::write(&target, b"( 1/\r\n)\r\n").expect("write target");

        let backup = create_backup(&target).expect("backup");
        assert_eq!(fs::read(&backup).expect("read"), b"( 1/\r\n)\r\n");
        assert!(
            backup
                .to_string_lossy()
                .contains("model.txt.backup_")
        );
    }

    #[test]
    fn delimited_wraps_body() {
        let body = vec!["1 2.0000 2.0000 0 0 0 0 /".to_string()];
        let lines: Vec<String> = delimited(SectionKind::Stiffness, &body).collect();
        assert_eq!(lines, vec!["( 3/", "1 2.0000 2.0000 0 0 0 0 /", ")"]);
    }
}

//! File-list driven batch runs.
//!
//! The list is a CSV file with an `IMAGE_NAME` column and optional
//! `FACE_CENTER_X`, `FACE_CENTER_Y` and `FACE_RADIUS` hint columns. Image
//! paths are relative to the list file.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use facefit_vision::{FaceDetector, FaceHint, Point};
use log::{info, warn};
use serde::Deserialize;

use crate::config::Config;
use crate::locate::locate_file;
use crate::report::LocalizationReport;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "IMAGE_NAME")]
    pub image_name: String,
    #[serde(rename = "FACE_CENTER_X", default)]
    pub face_center_x: Option<i32>,
    #[serde(rename = "FACE_CENTER_Y", default)]
    pub face_center_y: Option<i32>,
    #[serde(rename = "FACE_RADIUS", default)]
    pub face_radius: Option<i32>,
}

impl FileEntry {
    /// The labelled face, when all three hint columns are filled in and the
    /// radius is positive.
    pub fn hint(&self) -> Option<FaceHint> {
        match (self.face_center_x, self.face_center_y, self.face_radius) {
            (Some(x), Some(y), Some(r)) if r > 0 => Some(FaceHint::new(Point::new(x, y), r)),
            _ => None,
        }
    }

    pub fn resolve(&self, list_path: &Path) -> PathBuf {
        let name = Path::new(&self.image_name);
        match list_path.parent() {
            Some(dir) if name.is_relative() => dir.join(name),
            _ => name.to_path_buf(),
        }
    }
}

pub fn read_file_list(path: &Path) -> Result<Vec<FileEntry>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut entries = Vec::new();
    for (i, row) in reader.deserialize::<FileEntry>().enumerate() {
        // +2: one-based, after the header row
        let entry = row.with_context(|| format!("{}: bad row {}", path.display(), i + 2))?;
        if entry.image_name.is_empty() {
            continue;
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub located: usize,
    pub failed: usize,
}

/// Localize every entry of the list at `list_path`, writing one JSON line
/// per entry to `out`. A failing entry is reported and skipped.
pub fn run_batch<D, W>(
    cfg: &Config,
    list_path: &Path,
    detector: &mut D,
    out: &mut W,
) -> Result<BatchSummary>
where
    D: FaceDetector + ?Sized,
    W: Write,
{
    let entries = read_file_list(list_path)?;
    info!("{} entries in {}", entries.len(), list_path.display());

    let mut summary = BatchSummary::default();
    for entry in &entries {
        summary.total += 1;
        let path = entry.resolve(list_path);
        let report = match locate_file(cfg, &path, entry.hint(), &mut *detector) {
            Ok((report, _)) => report,
            Err(err) => {
                warn!("{}: {:#}", entry.image_name, err);
                summary.failed += 1;
                LocalizationReport::failed(path.display().to_string(), &err)
            }
        };
        if report.is_located() {
            summary.located += 1;
        }
        writeln!(out, "{}", report.to_json_line()?)?;
    }
    out.flush()?;

    info!(
        "batch done: {} located, {} failed, {} total",
        summary.located, summary.failed, summary.total
    );
    Ok(summary)
}

//! Image list and ground-truth box loading
//!
//! The image list is a text file with one path per line, relative to the
//! directory containing the list (a leading `.` is dropped, so `./img/1.png`
//! and `/img/1.png` both resolve under that directory). The box file is a JSON
//! array aligned with the image list.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::bbox::BoundingBox;

/// One entry of the box file
#[derive(Debug, Clone, Deserialize)]
struct BoxFileEntry {
    width: u32,
    height: u32,
    boxes: Vec<[f32; 4]>,
}

/// An image with its ground-truth text boxes
#[derive(Debug, Clone)]
pub struct Sample {
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub gt_boxes: Vec<BoundingBox>,
}

/// Images and ground-truth boxes the environment samples from
#[derive(Debug, Clone)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Build a dataset from in-memory samples
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        if samples.is_empty() {
            bail!("dataset contains no samples");
        }
        for sample in &samples {
            if sample.gt_boxes.is_empty() {
                bail!("{:?} has no ground-truth boxes", sample.image_path);
            }
            if sample.width == 0 || sample.height == 0 {
                bail!("{:?} has an empty image size", sample.image_path);
            }
        }
        Ok(Self { samples })
    }

    /// Load the image list and the aligned box file
    pub fn load(imagefile_path: &Path, boxfile_path: &Path) -> Result<Self> {
        let list = std::fs::read_to_string(imagefile_path)
            .with_context(|| format!("Failed to read image list {:?}", imagefile_path))?;
        let base = imagefile_path.parent().unwrap_or(Path::new("."));
        let image_paths: Vec<PathBuf> = list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| resolve_image_path(base, line))
            .collect();

        let box_json = std::fs::read_to_string(boxfile_path)
            .with_context(|| format!("Failed to read box file {:?}", boxfile_path))?;
        let entries: Vec<BoxFileEntry> = serde_json::from_str(&box_json)
            .with_context(|| format!("Failed to parse box file {:?}", boxfile_path))?;

        if entries.len() != image_paths.len() {
            bail!(
                "image list has {} entries but box file has {}",
                image_paths.len(),
                entries.len()
            );
        }

        let samples = image_paths
            .into_iter()
            .zip(entries)
            .map(|(image_path, entry)| Sample {
                image_path,
                width: entry.width,
                height: entry.height,
                gt_boxes: entry
                    .boxes
                    .iter()
                    .map(|b| BoundingBox::new(b[0], b[1], b[2], b[3]))
                    .collect(),
            })
            .collect();

        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Sample> {
        self.samples.get(idx)
    }
}

fn resolve_image_path(base: &Path, relative: &str) -> PathBuf {
    let trimmed = relative.trim_start_matches('.').trim_start_matches('/');
    base.join(trimmed)
}

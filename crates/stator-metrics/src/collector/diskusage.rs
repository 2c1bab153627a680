//! Filesystem usage via `statvfs(3)`.

use std::io;

use chrono::{DateTime, Utc};
use stator_core::{Label, Point, PointsAt};

use super::Collector;
use crate::error::CollectError;

const NAME: &str = "du";

/// Size, free space and used percentage for each configured path.
#[derive(Debug, Clone)]
pub struct DiskUsage {
    paths: Vec<String>,
}

impl DiskUsage {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl Collector for DiskUsage {
    /// Fails as a whole if any path cannot be read.
    fn collect(&self, stamp: DateTime<Utc>) -> Result<PointsAt, CollectError> {
        let mut pa = PointsAt::new(NAME, stamp);

        for path in &self.paths {
            let usage = statvfs(path).map_err(|source| CollectError::DiskUsage {
                path: path.clone(),
                source,
            })?;
            let labels = vec![Label::new("path", path.as_str())];

            pa.points.extend([
                Point::gauge("size", "Total size of the filesystem", "bytes", usage.size)
                    .with_labels(labels.clone()),
                Point::gauge(
                    "available",
                    "Available space on the filesystem",
                    "bytes",
                    usage.available,
                )
                .with_labels(labels.clone()),
                Point::gauge(
                    "used",
                    "Percentage of space on the filesystem in use",
                    "percent",
                    usage.used,
                )
                .with_labels(labels),
            ]);
        }

        Ok(pa)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Usage {
    size: u64,
    available: u64,
    used: f64,
}

impl Usage {
    /// Blocks reserved for root count neither as used nor as available.
    fn from_blocks(blocks: u64, free: u64, avail: u64, block_size: u64) -> Self {
        let size = blocks.saturating_mul(block_size);
        let available = avail.saturating_mul(block_size);

        let reserved = free.saturating_sub(avail);
        let total = blocks.saturating_sub(reserved).saturating_mul(block_size);
        let used = if total == 0 {
            0.0
        } else {
            total.saturating_sub(available) as f64 * 100.0 / total as f64
        };

        Self {
            size,
            available,
            used,
        }
    }
}

#[allow(clippy::unnecessary_cast)]
fn statvfs(path: &str) -> io::Result<Usage> {
    let st = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;

    Ok(Usage::from_blocks(
        st.blocks() as u64,
        st.blocks_free() as u64,
        st.blocks_available() as u64,
        st.fragment_size() as u64,
    ))
}

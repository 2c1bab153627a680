//! Prometheus text exposition format.
//!
//! Renders point groups into the text format for scraping by a Prometheus
//! server or compatible agent:
//!
//! ```text
//!
//! # HELP du_size_bytes Total size of the filesystem
//! # TYPE du_size_bytes gauge
//! du_size_bytes{path="/"} 250790436864 1395066363000
//! ```

use std::fmt::Write;

use stator_core::{Label, Point, PointsAt};

/// Turns one point group into exposition bytes.
pub trait Formatter: Send + Sync {
    fn format(&self, pa: &PointsAt) -> Vec<u8>;
}

/// Prometheus text format.
///
/// Points sharing a metric name are gathered under a single HELP/TYPE header,
/// in the order the name was first seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prometheus;

impl Formatter for Prometheus {
    fn format(&self, pa: &PointsAt) -> Vec<u8> {
        // (metric name, header, data lines)
        let mut blocks: Vec<(String, String, String)> = Vec::new();

        for pt in &pa.points {
            let name = metric_name(pa, pt);
            let datum = format!(
                "{name}{{{}}} {} {}\n",
                labels(pa.labels.iter().chain(pt.labels.iter())),
                pt.value,
                pa.stamp.timestamp_millis()
            );

            match blocks.iter_mut().find(|(n, _, _)| *n == name) {
                Some((_, _, data)) => data.push_str(&datum),
                None => {
                    let header = header(&name, pt);
                    blocks.push((name, header, datum));
                }
            }
        }

        let mut out = String::new();
        for (_, header, data) in blocks {
            out.push_str(&header);
            out.push_str(&data);
        }
        out.into_bytes()
    }
}

fn metric_name(pa: &PointsAt, pt: &Point) -> String {
    if pt.unit.is_empty() {
        format!("{}_{}", pa.name, pt.name)
    } else {
        format!("{}_{}_{}", pa.name, pt.name, pt.unit)
    }
}

fn header(name: &str, pt: &Point) -> String {
    let mut out = String::from("\n");
    let _ = writeln!(out, "# HELP {name} {}", pt.desc);
    let _ = writeln!(out, "# TYPE {name} {}", pt.kind);
    out
}

fn labels<'a>(labels: impl Iterator<Item = &'a Label>) -> String {
    labels
        .map(|l| format!("{}=\"{}\"", l.key, l.val))
        .collect::<Vec<_>>()
        .join(",")
}

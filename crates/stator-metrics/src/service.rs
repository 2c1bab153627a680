//! Runs collectors and formats their output.

use std::io;

use chrono::Utc;
use stator_core::{Context, Stats};
use tracing::error;

use crate::collector::{Collector, Process};
use crate::formatter::{Formatter, Prometheus};

/// Collects from every source and renders the results for scraping.
///
/// Holds no per-request state; callable from concurrent handlers.
pub struct StatsService {
    collectors: Vec<Box<dyn Collector>>,
    formatter: Box<dyn Formatter>,
}

impl StatsService {
    pub fn new(formatter: impl Formatter + 'static) -> Self {
        Self {
            collectors: Vec::new(),
            formatter: Box::new(formatter),
        }
    }

    /// Process counters in Prometheus format.
    pub fn expose_process(app_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        let mut svc = Self::new(Prometheus);
        svc.add_collector(Process::new(app_id, run_id));
        svc
    }

    pub fn add_collector(&mut self, collector: impl Collector + 'static) {
        self.collectors.push(Box::new(collector));
    }

    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Run every collector against one timestamp, skipping those that fail.
    pub fn collect(&self, ctx: &Context) -> Stats {
        let now = Utc::now();

        self.collectors
            .iter()
            .filter_map(|c| match c.collect(now) {
                Ok(pa) => Some(pa),
                Err(e) => {
                    error!(ctx = %ctx, error = %e, "failed to collect stats");
                    None
                }
            })
            .collect()
    }

    /// Concatenate the formatted groups in order.
    pub fn format(&self, stats: &Stats) -> Vec<u8> {
        stats
            .iter()
            .flat_map(|pa| self.formatter.format(pa))
            .collect()
    }

    pub fn render(&self, ctx: &Context) -> Vec<u8> {
        self.format(&self.collect(ctx))
    }

    /// Render into `writer`. A failed write is logged and dropped.
    pub fn expose(&self, ctx: &Context, writer: &mut impl io::Write) {
        let data = self.render(ctx);
        if let Err(e) = writer.write_all(&data) {
            error!(ctx = %ctx, error = %e, "failed to write stats to response");
        }
    }
}

//! Process counters read from procfs.
//!
//! CPU times, memory and thread count come from the process `stat` file;
//! open file descriptors are counted in its `fd` directory.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use procfs::process::Process as ProcfsProcess;
use stator_core::{Label, Point, PointsAt, Value};

use super::Collector;
use crate::error::CollectError;

const NAME: &str = "proc";

struct Counter {
    name: &'static str,
    unit: &'static str,
    desc: &'static str,
}

static CATALOGUE: [Counter; 6] = [
    Counter {
        name: "cpu_user",
        unit: "seconds",
        desc: "CPU time spent in user mode",
    },
    Counter {
        name: "cpu_system",
        unit: "seconds",
        desc: "CPU time spent in kernel mode",
    },
    Counter {
        name: "mem_resident",
        unit: "bytes",
        desc: "Resident set size",
    },
    Counter {
        name: "mem_virtual",
        unit: "bytes",
        desc: "Virtual memory size",
    },
    Counter {
        name: "threads",
        unit: "count",
        desc: "Number of threads in the process",
    },
    Counter {
        name: "open_fds",
        unit: "count",
        desc: "Number of open file descriptors",
    },
];

/// Counters for the current process, labelled with app, run and process ids.
#[derive(Debug, Clone)]
pub struct Process {
    app_id: String,
    run_id: String,
    /// A procfs process directory; `None` reads `/proc/self`.
    root: Option<PathBuf>,
}

impl Process {
    pub fn new(app_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            run_id: run_id.into(),
            root: None,
        }
    }

    /// Read from a different procfs process directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn open(&self) -> procfs::ProcResult<ProcfsProcess> {
        match &self.root {
            Some(root) => ProcfsProcess::new_with_root(root.clone()),
            None => ProcfsProcess::myself(),
        }
    }

    fn sample(&self) -> Result<[Value; 6], CollectError> {
        let failed = |e: procfs::ProcError| CollectError::Process {
            path: self.root_display(),
            reason: e.to_string(),
        };

        let process = self.open().map_err(failed)?;
        let stat = process.stat().map_err(failed)?;
        let open_fds = process.fd_count().map_err(failed)? as u64;

        let ticks = procfs::ticks_per_second().max(1) as f64;
        Ok([
            Value::Float(stat.utime as f64 / ticks),
            Value::Float(stat.stime as f64 / ticks),
            Value::Uint(stat.rss.saturating_mul(procfs::page_size())),
            Value::Uint(stat.vsize),
            Value::Uint(u64::try_from(stat.num_threads).unwrap_or(0)),
            Value::Uint(open_fds),
        ])
    }

    fn root_display(&self) -> String {
        self.root
            .as_ref()
            .map_or_else(|| "/proc/self".to_string(), |r| r.display().to_string())
    }
}

impl Collector for Process {
    fn collect(&self, stamp: DateTime<Utc>) -> Result<PointsAt, CollectError> {
        let values = self.sample()?;

        let mut pa = PointsAt::new(NAME, stamp);
        pa.labels = vec![
            Label::new("app_id", self.app_id.as_str()),
            Label::new("run_id", self.run_id.as_str()),
            Label::new("process_id", std::process::id().to_string()),
        ];
        pa.points = CATALOGUE
            .iter()
            .zip(values)
            .map(|(c, v)| Point::gauge(c.name, c.desc, c.unit, v))
            .collect();

        Ok(pa)
    }
}

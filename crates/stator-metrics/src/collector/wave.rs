//! Synthetic sinusoid series, handy for exercising dashboards.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;
use stator_core::{Label, Point, PointsAt, Value};

use super::Collector;
use crate::error::CollectError;

const NAME: &str = "wave";

/// Divides the call count before it is fed to each sinusoid.
const FREQUENCY_FACTOR: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
struct Sinusoid {
    frequency: f64,
    amplitude: f64,
    phase: f64,
}

#[derive(Debug, Clone)]
struct Series {
    name: &'static str,
    waves: Vec<Sinusoid>,
}

impl Series {
    fn at(&self, count: u64) -> f64 {
        self.waves
            .iter()
            .map(|w| w.amplitude * ((w.frequency / FREQUENCY_FACTOR) * count as f64 + w.phase).sin())
            .sum()
    }

    fn simple() -> Self {
        Self {
            name: "simple",
            waves: vec![Sinusoid {
                frequency: 1.0,
                amplitude: 1.0,
                phase: 0.0,
            }],
        }
    }

    fn three_random() -> Self {
        let mut rng = rand::rng();
        let waves = (1..=3)
            .map(|n| {
                let n = f64::from(n);
                Sinusoid {
                    frequency: 1.0 + rng.random::<f64>() * n,
                    amplitude: rng.random::<f64>() / n,
                    phase: rng.random::<f64>() * 2.0 * PI,
                }
            })
            .collect();
        Self {
            name: "three_random",
            waves,
        }
    }

    /// First four odd harmonics of a square wave.
    fn square() -> Self {
        let waves = (0..4)
            .map(|i| {
                let n = 2.0 * f64::from(i) + 1.0;
                Sinusoid {
                    frequency: n,
                    amplitude: 1.0 / n,
                    phase: 0.0,
                }
            })
            .collect();
        Self {
            name: "square",
            waves,
        }
    }
}

/// Waveform generator driven by a per-call counter.
#[derive(Debug)]
pub struct Wave {
    count: AtomicU64,
    series: Vec<Series>,
}

impl Wave {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            series: vec![Series::simple(), Series::three_random(), Series::square()],
        }
    }

    /// Number of collections so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Wave {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for Wave {
    fn collect(&self, stamp: DateTime<Utc>) -> Result<PointsAt, CollectError> {
        let count = self.count.fetch_add(1, Ordering::Relaxed);

        let mut pa = PointsAt::new(NAME, stamp);
        pa.points = self
            .series
            .iter()
            .map(|s| {
                Point::gauge("sine", "Sine wave(s)", "", Value::Float(s.at(count)))
                    .with_labels(vec![Label::new("name", s.name)])
            })
            .collect();

        Ok(pa)
    }
}

//! 轨迹记录：事件日志 + 按快照策略采样的标识序列。
//!
//! 事件 `(index, transition, time, pre-marking)` 全量保留；样本 `(time, M)`
//! 只追加不修改。`Interval` 策略在网格点 `k·Δ` 上采样，
//! 早于事件时刻的网格点取发生前的标识（保持最后值）。
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::net::{Marking, Net, PlaceId, TransitionId, Weight};
use crate::sim::error::SimError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub index: usize,
    pub transition: TransitionId,
    pub time: f64,
    /// Marking immediately before the firing.
    pub pre_marking: Marking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub marking: Marking,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Initial marking plus the marking after every event.
    #[default]
    EveryEvent,
    /// Fixed grid `k * interval`, last value held.
    Interval { interval: f64 },
}

impl SnapshotPolicy {
    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            SnapshotPolicy::EveryEvent => Ok(()),
            SnapshotPolicy::Interval { interval } if interval.is_finite() && interval > 0.0 => {
                Ok(())
            }
            SnapshotPolicy::Interval { interval } => Err(SimError::InvalidConfig(format!(
                "snapshot interval must be finite and positive, got {interval}"
            ))),
        }
    }
}

/// Append-only recorder driven by the simulation loop.
#[derive(Debug)]
pub struct Recorder {
    policy: SnapshotPolicy,
    trajectory: Trajectory,
    next_grid: u64,
}

impl Recorder {
    /// Starts a trajectory at time zero with `initial`.
    pub fn new(net: &Net, policy: SnapshotPolicy, initial: &Marking) -> Self {
        let mut recorder = Self {
            policy,
            trajectory: Trajectory {
                place_labels: net.places().map(|(_, p)| p.name.clone()).collect(),
                transition_labels: net.transitions().map(|(_, t)| t.name.clone()).collect(),
                policy,
                events: Vec::new(),
                samples: Vec::new(),
                final_marking: initial.clone(),
            },
            next_grid: 1,
        };
        recorder.record(0.0, initial);
        recorder
    }

    pub fn record(&mut self, time: f64, marking: &Marking) {
        self.trajectory.samples.push(Sample {
            time,
            marking: marking.clone(),
        });
    }

    fn fill_grid(&mut self, until: f64, inclusive: bool, marking: &Marking) {
        let SnapshotPolicy::Interval { interval } = self.policy else {
            return;
        };
        if !until.is_finite() {
            return;
        }
        loop {
            let at = self.next_grid as f64 * interval;
            let due = if inclusive { at <= until } else { at < until };
            if !due {
                break;
            }
            self.record(at, marking);
            self.next_grid += 1;
        }
    }

    pub fn on_event(&mut self, transition: TransitionId, time: f64, pre: Marking, post: &Marking) {
        self.fill_grid(time, false, &pre);
        let index = self.trajectory.events.len();
        self.trajectory.events.push(Event {
            index,
            transition,
            time,
            pre_marking: pre,
        });
        if self.policy == SnapshotPolicy::EveryEvent {
            self.record(time, post);
        }
    }

    /// Closes the trajectory at `end`, holding `marking` up to it.
    pub fn finish(mut self, end: f64, marking: &Marking) -> Trajectory {
        match self.policy {
            SnapshotPolicy::EveryEvent => {
                let last = self.trajectory.samples.last().map_or(0.0, |s| s.time);
                if end > last {
                    self.record(end, marking);
                }
            }
            SnapshotPolicy::Interval { .. } => self.fill_grid(end, true, marking),
        }
        self.trajectory.final_marking = marking.clone();
        self.trajectory
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    place_labels: Vec<String>,
    transition_labels: Vec<String>,
    policy: SnapshotPolicy,
    events: Vec<Event>,
    samples: Vec<Sample>,
    final_marking: Marking,
}

impl Trajectory {
    pub fn place_labels(&self) -> &[String] {
        &self.place_labels
    }

    pub fn transition_labels(&self) -> &[String] {
        &self.transition_labels
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn final_marking(&self) -> &Marking {
        &self.final_marking
    }

    /// Recorded samples in time order. The iterator can be cloned to restart.
    pub fn samples(&self) -> impl Iterator<Item = (f64, &Marking)> + Clone + '_ {
        self.samples.iter().map(|s| (s.time, &s.marking))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Marking in force at `time` (last value held). `None` before the first sample.
    pub fn value_at(&self, time: f64) -> Option<&Marking> {
        let idx = self.samples.partition_point(|s| s.time <= time);
        idx.checked_sub(1).map(|i| &self.samples[i].marking)
    }

    /// Re-samples onto the grid `k * interval` up to the last recorded time.
    pub fn resample(&self, interval: f64) -> Result<Resample<'_>, SimError> {
        SnapshotPolicy::Interval { interval }.validate()?;
        Ok(Resample {
            samples: &self.samples,
            interval,
            step: 0,
            cursor: 0,
            end: self.samples.last().map_or(f64::NEG_INFINITY, |s| s.time),
        })
    }

    /// Largest token count `place` reached over the whole run, events included.
    pub fn peak(&self, place: PlaceId) -> Weight {
        self.events
            .iter()
            .map(|e| &e.pre_marking)
            .chain(std::iter::once(&self.final_marking))
            .filter_map(|m| m.try_get(place))
            .max()
            .unwrap_or(0)
    }

    /// `time,<place labels>` followed by one row per sample.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "time,{}",
            self.place_labels.iter().map(|l| csv_field(l)).join(",")
        );
        for sample in &self.samples {
            let _ = writeln!(
                out,
                "{},{}",
                sample.time,
                sample.marking.as_slice().iter().join(",")
            );
        }
        out
    }

    /// `index,time,transition` event log.
    pub fn events_to_csv(&self) -> String {
        let mut out = String::from("index,time,transition\n");
        for event in &self.events {
            let label = self
                .transition_labels
                .get(event.transition.raw() as usize)
                .map_or_else(|| event.transition.to_string(), |l| csv_field(l));
            let _ = writeln!(out, "{},{},{}", event.index, event.time, label);
        }
        out
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        write_creating_dirs(path.as_ref(), &self.to_csv())
    }

    pub fn write_events_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        write_creating_dirs(path.as_ref(), &self.events_to_csv())
    }
}

fn write_creating_dirs(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Lazy grid view over a trajectory's samples.
#[derive(Debug, Clone)]
pub struct Resample<'a> {
    samples: &'a [Sample],
    interval: f64,
    step: u64,
    cursor: usize,
    end: f64,
}

impl<'a> Iterator for Resample<'a> {
    type Item = (f64, &'a Marking);

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.step as f64 * self.interval;
        if at > self.end {
            return None;
        }
        while self
            .samples
            .get(self.cursor + 1)
            .is_some_and(|next| next.time <= at)
        {
            self.cursor += 1;
        }
        self.step += 1;
        Some((at, &self.samples[self.cursor].marking))
    }
}

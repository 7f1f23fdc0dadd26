use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::net::{Net, Weight};
use crate::sim::{EnsembleSummary, RunOutcome, StopReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub stop: StopReason,
    pub events: usize,
    pub final_time: f64,
    pub final_marking: IndexMap<String, Weight>, // 按库所声明顺序
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub model: String,
    pub places: usize,
    pub transitions: usize,
    pub config: RunConfig,
    pub runs: Vec<RunSummary>,
    pub ensemble: Option<EnsembleSummary>,
}

impl SimulationReport {
    pub fn new(model: impl Into<String>, net: &Net, config: &RunConfig, outcomes: &[RunOutcome]) -> Self {
        let runs = outcomes
            .iter()
            .map(|outcome| RunSummary {
                seed: outcome.seed,
                stop: outcome.stop,
                events: outcome.events,
                final_time: outcome.final_time,
                final_marking: net
                    .places()
                    .map(|(id, place)| {
                        let tokens = outcome.final_marking().try_get(id).unwrap_or(0);
                        (place.name.clone(), tokens)
                    })
                    .collect(),
            })
            .collect();
        SimulationReport {
            model: model.into(),
            places: net.places_len(),
            transitions: net.transitions_len(),
            config: config.clone(),
            runs,
            ensemble: EnsembleSummary::from_outcomes(net, outcomes),
        }
    }

    /// 将报告保存到文件中：文本写入 `file_path`，JSON 写入同名 `.json` 文件
    /// （若 `file_path` 本身是 `.json`，文本改写入 `.txt`）。
    pub fn save_to_file<P: AsRef<Path>>(&self, file_path: P) -> std::io::Result<()> {
        let path = file_path.as_ref();
        let (text_path, json_path): (PathBuf, PathBuf) =
            if path.extension().is_some_and(|ext| ext == "json") {
                (path.with_extension("txt"), path.to_path_buf())
            } else {
                (path.to_path_buf(), path.with_extension("json"))
            };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&text_path)?;
        writeln!(file, "{}", self)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&json_path, json)?;
        debug!("report written to {:?} and {:?}", text_path, json_path);
        Ok(())
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Report")?;
        writeln!(f, "model: {}", self.model)?;
        writeln!(
            f,
            "net: {} places, {} transitions",
            self.places, self.transitions
        )?;
        let horizon = self
            .config
            .horizon
            .map_or_else(|| "unbounded".to_string(), |h| h.to_string());
        writeln!(
            f,
            "policy: {}, horizon: {}, max events: {}",
            self.config.policy.name(),
            horizon,
            self.config.max_events
        )?;
        for (i, run) in self.runs.iter().enumerate() {
            writeln!(
                f,
                "run {i} (seed {}): {:?} after {} events at t={}",
                run.seed, run.stop, run.events, run.final_time
            )?;
            let nonzero: Vec<String> = run
                .final_marking
                .iter()
                .filter(|(_, tokens)| **tokens > 0)
                .map(|(name, tokens)| format!("{name}={tokens}"))
                .collect();
            writeln!(f, "  final: {}", nonzero.join(", "))?;
        }
        if let Some(ensemble) = self.ensemble.as_ref().filter(|e| e.replicates > 1) {
            writeln!(
                f,
                "ensemble of {}: mean events {:.1}, mean final time {:.3}",
                ensemble.replicates, ensemble.mean_events, ensemble.mean_final_time
            )?;
            for stats in &ensemble.places {
                writeln!(
                    f,
                    "  {}: final {:.2} ± {:.2} [{}, {}], peak mean {:.2} max {}",
                    stats.place,
                    stats.final_mean,
                    stats.final_stdev,
                    stats.final_min,
                    stats.final_max,
                    stats.peak_mean,
                    stats.peak_max
                )?;
            }
        }
        Ok(())
    }
}

//! 多次重复实验的汇总统计。
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::net::{Net, Weight};
use crate::sim::driver::{RunOutcome, StopReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceStats {
    pub place: String,
    pub final_mean: f64,
    pub final_min: Weight,
    pub final_max: Weight,
    /// Sample standard deviation of the final counts (0 for a single run).
    pub final_stdev: f64,
    /// Mean over replicates of each run's peak count.
    pub peak_mean: f64,
    pub peak_max: Weight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSummary {
    pub replicates: usize,
    pub mean_events: f64,
    pub mean_final_time: f64,
    pub stops: BTreeMap<StopReason, usize>,
    pub places: Vec<PlaceStats>,
}

impl EnsembleSummary {
    /// `None` when there is nothing to summarise.
    pub fn from_outcomes(net: &Net, outcomes: &[RunOutcome]) -> Option<Self> {
        if outcomes.is_empty() {
            return None;
        }
        let n = outcomes.len() as f64;
        let mut stops = BTreeMap::new();
        for outcome in outcomes {
            *stops.entry(outcome.stop).or_insert(0) += 1;
        }

        let places = net
            .places()
            .map(|(id, place)| {
                let finals: Vec<Weight> = outcomes
                    .iter()
                    .map(|o| o.final_marking().try_get(id).unwrap_or(0))
                    .collect();
                let peaks: Vec<Weight> = outcomes.iter().map(|o| o.trajectory.peak(id)).collect();
                let final_mean = mean(&finals);
                PlaceStats {
                    place: place.name.clone(),
                    final_mean,
                    final_min: finals.iter().copied().min().unwrap_or(0),
                    final_max: finals.iter().copied().max().unwrap_or(0),
                    final_stdev: stdev(&finals, final_mean),
                    peak_mean: mean(&peaks),
                    peak_max: peaks.iter().copied().max().unwrap_or(0),
                }
            })
            .collect();

        Some(Self {
            replicates: outcomes.len(),
            mean_events: outcomes.iter().map(|o| o.events as f64).sum::<f64>() / n,
            mean_final_time: outcomes.iter().map(|o| o.final_time).sum::<f64>() / n,
            stops,
            places,
        })
    }

    pub fn place(&self, label: &str) -> Option<&PlaceStats> {
        self.places.iter().find(|p| p.place == label)
    }
}

fn mean(values: &[Weight]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

fn stdev(values: &[Weight], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::net::Rate;
    use crate::sim::driver::{Simulation, derive_seeds};

    fn decay_net(n: Weight) -> Net {
        let mut net = Net::empty();
        let m = net.add_place("mRNA", n).unwrap();
        let degrade = net.add_transition("degrade", Rate::mass_action(1.0)).unwrap();
        net.add_input_arc(m, degrade, 1).unwrap();
        net.freeze().unwrap();
        net
    }

    #[test]
    fn decay_to_zero_summary() {
        let net = decay_net(5);
        let sim = Simulation::new(&net).unwrap();
        let seeds = derive_seeds(3, 6);
        let outcomes = sim
            .replicate(&net.initial_marking(), &RunConfig::default(), &seeds)
            .unwrap();
        let summary = EnsembleSummary::from_outcomes(&net, &outcomes).unwrap();
        assert_eq!(summary.replicates, 6);
        assert_eq!(summary.mean_events, 5.0);
        assert_eq!(summary.stops.get(&StopReason::TerminalState), Some(&6));
        let mrna = summary.place("mRNA").unwrap();
        assert_eq!(mrna.final_max, 0);
        assert_eq!(mrna.final_stdev, 0.0);
        assert_eq!(mrna.peak_max, 5);
        assert_eq!(mrna.peak_mean, 5.0);
    }

    #[test]
    fn empty_ensemble_has_no_summary() {
        let net = decay_net(1);
        assert!(EnsembleSummary::from_outcomes(&net, &[]).is_none());
    }

    #[test]
    fn sample_stdev() {
        let values = [2, 4, 4, 4, 5, 5, 7, 9];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert!((stdev(&values, m) - 2.138_089_935).abs() < 1e-6);
    }
}

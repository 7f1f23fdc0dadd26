//! 发生调度：选出下一个发生的迁移及其发生时刻。
//!
//! * `Gillespie`：直接法。对可激发迁移求倾向 `a_i`，`A = Σ a_i`；
//!   等待时间 `dt ~ Exp(A)`，再以 `r ~ U[0, A)` 落入的累积区间选择迁移。
//! * `Timed`：确定性延迟。每个迁移在变为可激发时启动时钟，失效或发生时复位，
//!   最早到期者发生（同时到期按声明顺序）。
//! * `UniformStep`：离散步进，每步在可激发集中均匀选取一个迁移，时钟加一。
use rand::Rng;
use rand::distr::Open01;
use serde::{Deserialize, Serialize};

use crate::net::{IndexVec, Marking, Net, Rate, TransitionId};
use crate::sim::enabling::{enabled_into, is_enabled};
use crate::sim::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiringPolicy {
    #[default]
    Gillespie,
    Timed,
    UniformStep,
}

impl FiringPolicy {
    pub fn name(self) -> &'static str {
        match self {
            FiringPolicy::Gillespie => "gillespie",
            FiringPolicy::Timed => "timed",
            FiringPolicy::UniformStep => "uniform_step",
        }
    }

    /// Every transition's rate must make sense under this policy.
    pub fn validate(self, net: &Net) -> Result<(), SimError> {
        for (id, transition) in net.transitions() {
            let accepted = match self {
                FiringPolicy::Gillespie => !transition.rate.is_delay(),
                FiringPolicy::Timed => transition.rate.is_delay(),
                FiringPolicy::UniformStep => true,
            };
            if !accepted {
                return Err(SimError::PolicyMismatch {
                    transition: id,
                    name: transition.name.clone(),
                    policy: self.name(),
                });
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FiringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gillespie" => Ok(FiringPolicy::Gillespie),
            "timed" => Ok(FiringPolicy::Timed),
            "uniform_step" | "uniform" => Ok(FiringPolicy::UniformStep),
            other => Err(format!("unknown firing policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Fire { transition: TransitionId, dt: f64 },
    /// Nothing can fire any more.
    Terminal,
}

/// Per-run scheduler state. Cheap to build; create one per run.
#[derive(Debug)]
pub struct Scheduler {
    policy: FiringPolicy,
    enabled: Vec<TransitionId>,
    propensities: Vec<f64>,
    enabled_at: IndexVec<TransitionId, Option<f64>>,
}

/// Propensity of `transition` under `marking`, validated to be finite and
/// non-negative.
pub fn propensity(net: &Net, marking: &Marking, transition: TransitionId) -> Result<f64, SimError> {
    let spec = net
        .transition(transition)
        .ok_or(SimError::Fire(crate::net::FireError::UnknownTransition(transition)))?;
    let value = spec.rate.propensity(marking, spec.inputs());
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::InvalidPropensity {
            transition,
            name: spec.name.clone(),
            value,
        });
    }
    Ok(value)
}

impl Scheduler {
    pub fn new(net: &Net, policy: FiringPolicy) -> Result<Self, SimError> {
        policy.validate(net)?;
        Ok(Self {
            policy,
            enabled: Vec::with_capacity(net.transitions_len()),
            propensities: Vec::with_capacity(net.transitions_len()),
            enabled_at: IndexVec::from_elem(None, net.transitions_len()),
        })
    }

    pub fn policy(&self) -> FiringPolicy {
        self.policy
    }

    pub fn next<R: Rng + ?Sized>(
        &mut self,
        net: &Net,
        marking: &Marking,
        clock: f64,
        rng: &mut R,
    ) -> Result<Decision, SimError> {
        match self.policy {
            FiringPolicy::Gillespie => self.next_gillespie(net, marking, rng),
            FiringPolicy::Timed => Ok(self.next_timed(net, marking, clock)),
            FiringPolicy::UniformStep => Ok(self.next_uniform(net, marking, rng)),
        }
    }

    fn next_gillespie<R: Rng + ?Sized>(
        &mut self,
        net: &Net,
        marking: &Marking,
        rng: &mut R,
    ) -> Result<Decision, SimError> {
        enabled_into(net, marking, &mut self.enabled);
        self.propensities.clear();
        let mut total = 0.0;
        for &transition in &self.enabled {
            let value = propensity(net, marking, transition)?;
            self.propensities.push(value);
            total += value;
        }
        if total <= 0.0 {
            return Ok(Decision::Terminal);
        }
        if !total.is_finite() {
            let transition = self.enabled[self.enabled.len() - 1];
            return Err(SimError::InvalidPropensity {
                transition,
                name: net.transitions[transition].name.clone(),
                value: total,
            });
        }

        // u ∈ (0, 1) keeps dt strictly positive
        let u: f64 = rng.sample(Open01);
        let mut dt = -u.ln() / total;
        if dt <= 0.0 {
            dt = f64::MIN_POSITIVE;
        }
        // a subnormal total overflows the waiting time: nothing fires in finite time
        if !dt.is_finite() {
            return Ok(Decision::Terminal);
        }

        let r = rng.random::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = None;
        for (idx, &value) in self.propensities.iter().enumerate() {
            if value <= 0.0 {
                continue;
            }
            cumulative += value;
            chosen = Some(idx);
            if r < cumulative {
                break;
            }
        }
        // total > 0 guarantees at least one positive propensity
        let idx = chosen.unwrap_or(0);
        Ok(Decision::Fire {
            transition: self.enabled[idx],
            dt,
        })
    }

    fn next_timed(&mut self, net: &Net, marking: &Marking, clock: f64) -> Decision {
        let mut best: Option<(TransitionId, f64)> = None;
        for (transition, spec) in net.transitions() {
            let slot = &mut self.enabled_at[transition];
            if !is_enabled(net, marking, transition) {
                *slot = None;
                continue;
            }
            let since = *slot.get_or_insert(clock);
            let delay = match spec.rate {
                Rate::Delay { delay } => delay,
                _ => continue,
            };
            let due = since + delay;
            if best.is_none_or(|(_, earliest)| due < earliest) {
                best = Some((transition, due));
            }
        }

        match best {
            Some((transition, due)) => {
                self.enabled_at[transition] = None;
                Decision::Fire {
                    transition,
                    dt: (due - clock).max(0.0),
                }
            }
            None => Decision::Terminal,
        }
    }

    fn next_uniform<R: Rng + ?Sized>(
        &mut self,
        net: &Net,
        marking: &Marking,
        rng: &mut R,
    ) -> Decision {
        enabled_into(net, marking, &mut self.enabled);
        if self.enabled.is_empty() {
            return Decision::Terminal;
        }
        let idx = rng.random_range(0..self.enabled.len());
        Decision::Fire {
            transition: self.enabled[idx],
            dt: 1.0,
        }
    }
}

//! 迁移的速率（倾向）函数。
//!
//! 随机模式下倾向 `a(M)` 决定迁移被选中的概率及等待时间；
//! 定时模式下使用固定延迟 `Delay`。
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::net::marking::Marking;
use crate::net::structure::Weight;
use crate::net::ids::PlaceId;

/// User supplied propensity function. Must be pure and return a finite,
/// non-negative value.
pub type RateFn = Arc<dyn Fn(&Marking) -> f64 + Send + Sync>;

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rate {
    /// Fires with a fixed propensity whenever enabled.
    Constant { rate: f64 },
    /// `k · Π C(M[p], w)` over the input arcs.
    MassAction { k: f64 },
    /// Deterministic firing delay, only meaningful for timed runs.
    Delay { delay: f64 },
    #[serde(skip)]
    Custom(RateFn),
}

impl Rate {
    pub fn constant(rate: f64) -> Self {
        Rate::Constant { rate }
    }

    pub fn mass_action(k: f64) -> Self {
        Rate::MassAction { k }
    }

    pub fn delay(delay: f64) -> Self {
        Rate::Delay { delay }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Marking) -> f64 + Send + Sync + 'static,
    {
        Rate::Custom(Arc::new(f))
    }

    /// Parameter that must be finite and non-negative, if any.
    pub(crate) fn parameter(&self) -> Option<f64> {
        match self {
            Rate::Constant { rate } => Some(*rate),
            Rate::MassAction { k } => Some(*k),
            Rate::Delay { delay } => Some(*delay),
            Rate::Custom(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.parameter()
            .map_or(true, |value| value.is_finite() && value >= 0.0)
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, Rate::Delay { .. })
    }

    pub fn is_serializable(&self) -> bool {
        !matches!(self, Rate::Custom(_))
    }

    /// Propensity under `marking`; `inputs` are the transition's input arcs.
    ///
    /// `Delay` has no stochastic propensity and yields `0.0`.
    pub fn propensity(&self, marking: &Marking, inputs: &[(PlaceId, Weight)]) -> f64 {
        match self {
            Rate::Constant { rate } => *rate,
            Rate::MassAction { k } => {
                let mut value = *k;
                for &(place, weight) in inputs {
                    value *= binomial(marking.get(place), weight);
                    if value == 0.0 {
                        break;
                    }
                }
                value
            }
            Rate::Delay { .. } => 0.0,
            Rate::Custom(f) => f(marking),
        }
    }
}

/// `C(n, k)` as `f64`, zero when `n < k`.
fn binomial(n: Weight, k: Weight) -> f64 {
    if n < k {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

impl Default for Rate {
    fn default() -> Self {
        Rate::MassAction { k: 1.0 }
    }
}

impl fmt::Debug for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::Constant { rate } => f.debug_struct("Constant").field("rate", rate).finish(),
            Rate::MassAction { k } => f.debug_struct("MassAction").field("k", k).finish(),
            Rate::Delay { delay } => f.debug_struct("Delay").field("delay", delay).finish(),
            Rate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Rate::Constant { rate: a }, Rate::Constant { rate: b }) => a == b,
            (Rate::MassAction { k: a }, Rate::MassAction { k: b }) => a == b,
            (Rate::Delay { delay: a }, Rate::Delay { delay: b }) => a == b,
            (Rate::Custom(a), Rate::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

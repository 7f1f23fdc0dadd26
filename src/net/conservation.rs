//! 守恒律：加权库所集合 `y`，要求对任意发生都有 `yᵀ·M' = yᵀ·M`。
//!
//! 结构上等价于 `y` 为 P-不变量（`yᵀ·C = 0`），在 `Net::freeze` 时校验。
use serde::{Deserialize, Serialize};

use crate::net::ids::PlaceId;
use crate::net::marking::Marking;
use crate::net::structure::Weight;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConservationLaw {
    pub name: String,
    pub weights: Vec<(PlaceId, Weight)>,
}

impl ConservationLaw {
    pub fn new(name: impl Into<String>, weights: Vec<(PlaceId, Weight)>) -> Self {
        Self {
            name: name.into(),
            weights,
        }
    }

    /// Unit-weighted law over `places`.
    pub fn uniform(name: impl Into<String>, places: impl IntoIterator<Item = PlaceId>) -> Self {
        Self::new(name, places.into_iter().map(|place| (place, 1)).collect())
    }

    /// Weighted token sum `Σ w_p · M[p]`.
    pub fn value(&self, marking: &Marking) -> u128 {
        self.weights
            .iter()
            .map(|&(place, weight)| weight as u128 * marking.get(place) as u128)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_weighted_sum() {
        let law = ConservationLaw::new("dimer", vec![(PlaceId::new(0), 1), (PlaceId::new(1), 2)]);
        let marking = Marking::from(vec![4, 3, 100]);
        assert_eq!(law.value(&marking), 10);
    }
}

//! 标识存储：每个库所当前的令牌数，以及迁移发生（firing）的原子应用。
//!
//! 发生语义 `M' = M - Pre[:, t] + Post[:, t]`。应用前重新检查全部输入弧，
//! 任一输入库所不足即整体失败，标识保持不变。
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::core::Net;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::structure::Weight;

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition {0:?} does not exist in the net")]
    UnknownTransition(TransitionId),
    #[error(
        "transition {transition:?} ({transition_name}) needs {required} token(s) in place \
         {place:?} ({place_name}) but only {available} are present; marking: {marking:?}"
    )]
    InsufficientTokens {
        transition: TransitionId,
        transition_name: String,
        place: PlaceId,
        place_name: String,
        available: Weight,
        required: Weight,
        marking: Marking,
    },
    #[error("marking covers {found} place(s) but the net declares {expected}")]
    MarkingMismatch { expected: usize, found: usize },
    #[error("token count overflow in place {place:?} while firing {transition:?}")]
    Overflow {
        transition: TransitionId,
        place: PlaceId,
    },
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Marking(IndexVec<PlaceId, Weight>);

impl Marking {
    pub fn new(tokens: IndexVec<PlaceId, Weight>) -> Self {
        Self(tokens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Token count of `place`.
    ///
    /// Panics if `place` is not part of this marking.
    pub fn get(&self, place: PlaceId) -> Weight {
        self.0[place]
    }

    pub fn try_get(&self, place: PlaceId) -> Option<Weight> {
        self.0.get(place).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Weight)> + '_ {
        self.0.iter_enumerated().map(|(place, tokens)| (place, *tokens))
    }

    pub fn as_slice(&self) -> &[Weight] {
        self.0.as_slice()
    }

    pub fn total(&self) -> u128 {
        self.0.iter().map(|&tokens| tokens as u128).sum()
    }

    /// Marking after firing `transition`; `self` is left untouched.
    pub fn apply(&self, transition: TransitionId, net: &Net) -> Result<Marking, FireError> {
        let mut next = self.clone();
        next.apply_in_place(transition, net)?;
        Ok(next)
    }

    /// Fires `transition` on `self`. On error nothing has been modified.
    pub fn apply_in_place(&mut self, transition: TransitionId, net: &Net) -> Result<(), FireError> {
        let Some(spec) = net.transitions.get(transition) else {
            return Err(FireError::UnknownTransition(transition));
        };
        if self.len() != net.places_len() {
            return Err(FireError::MarkingMismatch {
                expected: net.places_len(),
                found: self.len(),
            });
        }

        for &(place, required) in spec.inputs() {
            let available = self.get(place);
            if available < required {
                return Err(FireError::InsufficientTokens {
                    transition,
                    transition_name: spec.name.clone(),
                    place,
                    place_name: net.places[place].name.clone(),
                    available,
                    required,
                    marking: self.clone(),
                });
            }
        }

        // 先检查溢出，保证失败时标识不被部分修改
        for &(place, produced) in spec.outputs() {
            let consumed = spec
                .inputs()
                .iter()
                .find(|(input, _)| *input == place)
                .map_or(0, |(_, weight)| *weight);
            if (self.get(place) - consumed).checked_add(produced).is_none() {
                return Err(FireError::Overflow { transition, place });
            }
        }

        for &(place, weight) in spec.inputs() {
            self.0[place] -= weight;
        }
        for &(place, weight) in spec.outputs() {
            self.0[place] += weight;
        }
        Ok(())
    }
}

impl From<Vec<Weight>> for Marking {
    fn from(value: Vec<Weight>) -> Self {
        Self(IndexVec::from(value))
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            if tokens > 0 {
                map.entry(&place, &tokens);
            }
        }
        map.finish()
    }
}

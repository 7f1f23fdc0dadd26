//! P/T 网静态结构元素：库所、迁移与弧。
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::rate::Rate;

pub type Weight = u64;

/// Sparse arc list of one transition, in declaration order.
pub type ArcList = SmallVec<[(PlaceId, Weight); 4]>;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
    /// Initial token count.
    pub tokens: Weight,
}

impl Place {
    pub fn new(name: impl Into<String>, tokens: Weight) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct Transition {
    pub name: String,
    pub rate: Rate,
    pub(crate) inputs: ArcList,
    pub(crate) outputs: ArcList,
}

impl Transition {
    pub fn new(name: impl Into<String>, rate: Rate) -> Self {
        Self {
            name: name.into(),
            rate,
            inputs: ArcList::new(),
            outputs: ArcList::new(),
        }
    }

    /// Input arcs `(place, weight)`; repeated arcs are already merged.
    pub fn inputs(&self) -> &[(PlaceId, Weight)] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[(PlaceId, Weight)] {
        &self.outputs
    }

    pub(crate) fn arcs_mut(&mut self, direction: ArcDirection) -> &mut ArcList {
        match direction {
            ArcDirection::PlaceToTransition => &mut self.inputs,
            ArcDirection::TransitionToPlace => &mut self.outputs,
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("rate", &self.rate)
            .finish()
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub weight: Weight,
    pub direction: ArcDirection,
}

/// 输入弧: place -> transition；输出弧: transition -> place。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

impl Arc {
    pub fn new(
        place: PlaceId,
        transition: TransitionId,
        weight: Weight,
        direction: ArcDirection,
    ) -> Self {
        Self {
            place,
            transition,
            weight,
            direction,
        }
    }

    pub fn input(place: PlaceId, transition: TransitionId, weight: Weight) -> Self {
        Self::new(place, transition, weight, ArcDirection::PlaceToTransition)
    }

    pub fn output(place: PlaceId, transition: TransitionId, weight: Weight) -> Self {
        Self::new(place, transition, weight, ArcDirection::TransitionToPlace)
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            ArcDirection::PlaceToTransition => {
                write!(f, "{:?} -{}-> {:?}", self.place, self.weight, self.transition)
            }
            ArcDirection::TransitionToPlace => {
                write!(f, "{:?} -{}-> {:?}", self.transition, self.weight, self.place)
            }
        }
    }
}

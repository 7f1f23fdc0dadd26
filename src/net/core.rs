//! 网定义：库所、迁移、弧与守恒律的构建，以及冻结后的只读访问。
//!
//! 构建阶段所有修改操作返回 `Result`；`freeze()` 之后网结构不可再变，
//! 任何修改都以 [`NetError::NetFrozen`] 失败。冻结的网可被多个仿真
//! 并发只读共享。
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::net::conservation::ConservationLaw;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::IndexVec;
use crate::net::marking::Marking;
use crate::net::rate::Rate;
use crate::net::structure::{Arc, ArcDirection, Place, Transition, Weight};

#[derive(Debug, Error, PartialEq)]
pub enum NetError {
    #[error("unknown place {0:?}")]
    UnknownPlace(PlaceId),
    #[error("unknown transition {0:?}")]
    UnknownTransition(TransitionId),
    #[error("arc {place:?}/{transition:?} has invalid weight {weight}; weights must be positive")]
    InvalidWeight {
        place: PlaceId,
        transition: TransitionId,
        weight: Weight,
    },
    #[error("net is frozen and can no longer be modified")]
    NetFrozen,
    #[error("label `{0}` is already declared")]
    DuplicateLabel(String),
    #[error("transition `{name}` has invalid rate {rate:?}; parameters must be finite and >= 0")]
    InvalidRate { name: String, rate: Rate },
    #[error("conservation law `{law}` is violated by transition {transition:?} (net change {delta})")]
    ConservationViolated {
        law: String,
        transition: TransitionId,
        delta: i128,
    },
}

impl NetError {
    /// Construction referenced a place or transition that does not exist.
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, NetError::UnknownPlace(_) | NetError::UnknownTransition(_))
    }
}

/// Petri 网连通性诊断报告
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// 孤立库所（无任何连接的弧）
    pub isolated_places: Vec<(PlaceId, String)>,
    /// 孤立变迁（无任何连接的弧）
    pub isolated_transitions: Vec<(TransitionId, String)>,
    pub warnings: Vec<String>,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

#[derive(Clone)]
pub struct Net {
    pub(crate) places: IndexVec<PlaceId, Place>,
    pub(crate) transitions: IndexVec<TransitionId, Transition>,
    pre: Incidence<Weight>,
    post: Incidence<Weight>,
    conservation: Vec<ConservationLaw>,
    place_names: HashMap<String, PlaceId>,
    transition_names: HashMap<String, TransitionId>,
    frozen: bool,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("conservation", &self.conservation)
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            pre: Incidence::new(0, 0),
            post: Incidence::new(0, 0),
            conservation: Vec::new(),
            place_names: HashMap::new(),
            transition_names: HashMap::new(),
            frozen: false,
        }
    }

    fn ensure_mutable(&self) -> Result<(), NetError> {
        if self.frozen {
            return Err(NetError::NetFrozen);
        }
        Ok(())
    }

    pub fn add_place(
        &mut self,
        name: impl Into<String>,
        initial_tokens: Weight,
    ) -> Result<PlaceId, NetError> {
        self.ensure_mutable()?;
        let name = name.into();
        if self.place_names.contains_key(&name) {
            return Err(NetError::DuplicateLabel(name));
        }
        let place = self.places.push(Place::new(name.clone(), initial_tokens));
        self.pre.push_place();
        self.post.push_place();
        self.place_names.insert(name, place);
        Ok(place)
    }

    pub fn add_transition(
        &mut self,
        name: impl Into<String>,
        rate: Rate,
    ) -> Result<TransitionId, NetError> {
        self.ensure_mutable()?;
        let name = name.into();
        if self.transition_names.contains_key(&name) {
            return Err(NetError::DuplicateLabel(name));
        }
        if !rate.is_valid() {
            return Err(NetError::InvalidRate { name, rate });
        }
        let transition = self.transitions.push(Transition::new(name.clone(), rate));
        self.pre.push_transition();
        self.post.push_transition();
        self.transition_names.insert(name, transition);
        Ok(transition)
    }

    /// Adds (or reinforces) an arc. Repeated arcs with the same endpoints
    /// and direction accumulate their weights.
    pub fn add_arc(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
        weight: Weight,
    ) -> Result<(), NetError> {
        self.ensure_mutable()?;
        if !self.places.contains(place) {
            return Err(NetError::UnknownPlace(place));
        }
        if !self.transitions.contains(transition) {
            return Err(NetError::UnknownTransition(transition));
        }
        if weight == 0 {
            return Err(NetError::InvalidWeight {
                place,
                transition,
                weight,
            });
        }

        let matrix = match direction {
            ArcDirection::PlaceToTransition => &mut self.pre,
            ArcDirection::TransitionToPlace => &mut self.post,
        };
        let entry = matrix.get_mut(place, transition);
        *entry = entry.saturating_add(weight);
        let merged = *entry;

        let arcs = self.transitions[transition].arcs_mut(direction);
        match arcs.iter_mut().find(|(existing, _)| *existing == place) {
            Some(slot) => slot.1 = merged,
            None => arcs.push((place, merged)),
        }
        Ok(())
    }

    /// 输入弧: place -> transition
    pub fn add_input_arc(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        weight: Weight,
    ) -> Result<(), NetError> {
        self.add_arc(place, transition, ArcDirection::PlaceToTransition, weight)
    }

    /// 输出弧: transition -> place
    pub fn add_output_arc(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        weight: Weight,
    ) -> Result<(), NetError> {
        self.add_arc(place, transition, ArcDirection::TransitionToPlace, weight)
    }

    pub fn add_conservation_law(&mut self, law: ConservationLaw) -> Result<(), NetError> {
        self.ensure_mutable()?;
        if let Some(&(place, _)) = law
            .weights
            .iter()
            .find(|(place, _)| !self.places.contains(*place))
        {
            return Err(NetError::UnknownPlace(place));
        }
        self.conservation.push(law);
        Ok(())
    }

    /// Seals the structure. Declared conservation laws must be P-invariants
    /// of the net, otherwise freezing fails and the net stays mutable.
    pub fn freeze(&mut self) -> Result<(), NetError> {
        if self.frozen {
            return Ok(());
        }
        let effect = self.c_matrix();
        for law in &self.conservation {
            for transition in self.transitions.indices() {
                let delta = law_delta(&effect, law, transition);
                if delta != 0 {
                    return Err(NetError::ConservationViolated {
                        law: law.name.clone(),
                        transition,
                        delta,
                    });
                }
            }
        }
        self.log_diagnostics();
        self.frozen = true;
        log::debug!(
            "net frozen: {} places, {} transitions, {} conservation law(s)",
            self.places_len(),
            self.transitions_len(),
            self.conservation.len()
        );
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn places(&self) -> impl Iterator<Item = (PlaceId, &Place)> + '_ {
        self.places.iter_enumerated()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> + '_ {
        self.transitions.iter_enumerated()
    }

    pub fn place_by_name(&self, name: &str) -> Option<PlaceId> {
        self.place_names.get(name).copied()
    }

    pub fn transition_by_name(&self, name: &str) -> Option<TransitionId> {
        self.transition_names.get(name).copied()
    }

    /// All arcs, grouped per transition: inputs first, then outputs.
    pub fn arcs(&self) -> impl Iterator<Item = Arc> + '_ {
        self.transitions
            .iter_enumerated()
            .flat_map(|(transition, spec)| {
                let inputs = spec
                    .inputs()
                    .iter()
                    .map(move |&(place, weight)| Arc::input(place, transition, weight));
                let outputs = spec
                    .outputs()
                    .iter()
                    .map(move |&(place, weight)| Arc::output(place, transition, weight));
                inputs.chain(outputs)
            })
    }

    pub fn conservation_laws(&self) -> &[ConservationLaw] {
        &self.conservation
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::from(self.places.iter().map(|p| p.tokens).collect::<Vec<_>>())
    }

    pub fn incidence(&self) -> (&Incidence<Weight>, &Incidence<Weight>) {
        (&self.pre, &self.post)
    }

    /// 效应矩阵 `C = Post - Pre`。
    pub fn c_matrix(&self) -> Incidence<i128> {
        self.post.difference(&self.pre)
    }

    /// First declared law whose value differs between `marking` and `reference`.
    pub fn check_conservation(
        &self,
        marking: &Marking,
        reference: &Marking,
    ) -> Option<&ConservationLaw> {
        self.conservation
            .iter()
            .find(|law| law.value(marking) != law.value(reference))
    }

    /// 诊断信息：检测孤立节点、永不被标记的库所与源/汇迁移
    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();

        for (place_id, place) in self.places.iter_enumerated() {
            let consumed = self.pre.row(place_id).iter().any(|w| *w > 0);
            let produced = self.post.row(place_id).iter().any(|w| *w > 0);

            if !consumed && !produced {
                report.isolated_places.push((place_id, place.name.clone()));
            } else if !produced && place.tokens == 0 {
                report.warnings.push(format!(
                    "place '{}' ({:?}) is never produced and starts empty; its consumers can never fire",
                    place.name, place_id
                ));
            }
        }

        for (trans_id, trans) in self.transitions.iter_enumerated() {
            if trans.inputs().is_empty() && trans.outputs().is_empty() {
                report
                    .isolated_transitions
                    .push((trans_id, trans.name.clone()));
            } else if trans.inputs().is_empty() {
                log::debug!(
                    "transition '{}' ({:?}) has no input arcs and is always enabled",
                    trans.name,
                    trans_id
                );
            }
        }

        report
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();
        if !report.has_issues() {
            return;
        }
        for (id, name) in &report.isolated_places {
            log::warn!("孤立库所 [{:?}] {}", id, name);
        }
        for (id, name) in &report.isolated_transitions {
            log::warn!("孤立变迁 [{:?}] {}", id, name);
        }
        for warning in &report.warnings {
            log::warn!("{}", warning);
        }
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

/// `yᵀ·C[:, t]`: net change of `law` when `transition` fires.
fn law_delta(effect: &Incidence<i128>, law: &ConservationLaw, transition: TransitionId) -> i128 {
    law.weights
        .iter()
        .map(|&(place, weight)| weight as i128 * *effect.get(place, transition))
        .sum()
}

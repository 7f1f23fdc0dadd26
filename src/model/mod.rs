//! # 模型定义格式
//!
//! 以名称描述的网：`places`（有序的 名称 → 初始令牌数）、`transitions`
//! （`consume` / `produce` 为 名称 → 权重）以及守恒律。
//! 可按扩展名读写 JSON / RON / YAML，`build()` 生成冻结的 [`Net`]。
//!
//! ```json
//! {
//!   "places": { "p_chainA_0": 200, "p_M": 100 },
//!   "transitions": [
//!     { "name": "t_chainA_t1",
//!       "rate": { "kind": "mass_action", "k": 1.0 },
//!       "consume": { "p_chainA_0": 1, "p_M": 1 },
//!       "produce": { "p_chainA_1": 1 } }
//!   ]
//! }
//! ```
pub mod mrna;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::io::{self, IoError};
use crate::net::{ConservationLaw, Net, NetError, Rate, Weight};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("transition `{transition}` references undeclared place `{place}`")]
    UndeclaredPlace { transition: String, place: String },
    #[error("conservation law `{law}` references undeclared place `{place}`")]
    UndeclaredLawPlace { law: String, place: String },
    #[error("transition `{0}` has a custom rate that cannot be serialised")]
    UnserializableRate(String),
    #[error(transparent)]
    Io(#[from] IoError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionDef {
    pub name: String,
    #[serde(default)]
    pub rate: Rate,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub consume: IndexMap<String, Weight>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub produce: IndexMap<String, Weight>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LawDef {
    pub name: String,
    pub weights: IndexMap<String, Weight>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub places: IndexMap<String, Weight>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conservation: Vec<LawDef>,
}

impl ModelDefinition {
    /// Builds and freezes the net. Places keep their declaration order, so
    /// `PlaceId`s follow the order of `places`.
    pub fn build(&self) -> Result<Net, ModelError> {
        let mut net = Net::empty();
        for (name, &tokens) in &self.places {
            net.add_place(name.clone(), tokens)?;
        }
        for def in &self.transitions {
            let transition = net.add_transition(def.name.clone(), def.rate.clone())?;
            for (name, &weight) in &def.consume {
                let place = net
                    .place_by_name(name)
                    .ok_or_else(|| ModelError::UndeclaredPlace {
                        transition: def.name.clone(),
                        place: name.clone(),
                    })?;
                net.add_input_arc(place, transition, weight)?;
            }
            for (name, &weight) in &def.produce {
                let place = net
                    .place_by_name(name)
                    .ok_or_else(|| ModelError::UndeclaredPlace {
                        transition: def.name.clone(),
                        place: name.clone(),
                    })?;
                net.add_output_arc(place, transition, weight)?;
            }
        }
        for law in &self.conservation {
            let mut weights = Vec::with_capacity(law.weights.len());
            for (name, &weight) in &law.weights {
                let place = net
                    .place_by_name(name)
                    .ok_or_else(|| ModelError::UndeclaredLawPlace {
                        law: law.name.clone(),
                        place: name.clone(),
                    })?;
                weights.push((place, weight));
            }
            net.add_conservation_law(ConservationLaw::new(law.name.clone(), weights))?;
        }
        net.freeze()?;
        Ok(net)
    }

    /// Describes `net` by labels. Fails on custom rates, which have no data form.
    pub fn from_net(net: &Net) -> Result<Self, ModelError> {
        let label = |place| {
            net.place(place)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| place.to_string())
        };
        let places = net
            .places()
            .map(|(_, p)| (p.name.clone(), p.tokens))
            .collect();
        let mut transitions = Vec::with_capacity(net.transitions_len());
        for (_, t) in net.transitions() {
            if !t.rate.is_serializable() {
                return Err(ModelError::UnserializableRate(t.name.clone()));
            }
            transitions.push(TransitionDef {
                name: t.name.clone(),
                rate: t.rate.clone(),
                consume: t.inputs().iter().map(|&(p, w)| (label(p), w)).collect(),
                produce: t.outputs().iter().map(|&(p, w)| (label(p), w)).collect(),
            });
        }
        let conservation = net
            .conservation_laws()
            .iter()
            .map(|law| LawDef {
                name: law.name.clone(),
                weights: law.weights.iter().map(|&(p, w)| (label(p), w)).collect(),
            })
            .collect();
        Ok(Self {
            places,
            transitions,
            conservation,
        })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        Ok(io::read(path)?)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        Ok(io::write(path, self)?)
    }

    /// Reads a model file and builds its net in one go.
    pub fn load_net<P: AsRef<Path>>(path: P) -> Result<Net, ModelError> {
        Self::read(path)?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::io::Format;

    const TRANSCRIBE: &str = r#"{
        "places": { "gene": 1, "mRNA": 0 },
        "transitions": [
            { "name": "transcribe",
              "rate": { "kind": "constant", "rate": 1.0 },
              "consume": { "gene": 1 },
              "produce": { "gene": 1, "mRNA": 1 } }
        ]
    }"#;

    #[test]
    fn builds_from_json() {
        let model: ModelDefinition = io::from_str(TRANSCRIBE, Format::Json).unwrap();
        let net = model.build().unwrap();
        assert!(net.is_frozen());
        let mrna = net.place_by_name("mRNA").unwrap();
        let transcribe = net.transition_by_name("transcribe").unwrap();
        let next = net.initial_marking().apply(transcribe, &net).unwrap();
        assert_eq!(next.get(mrna), 1);
        assert_eq!(net.transition(transcribe).unwrap().rate, Rate::constant(1.0));
    }

    #[test]
    fn missing_rate_defaults_to_mass_action() {
        let yaml = "places:\n  a: 2\ntransitions:\n  - name: drain\n    consume:\n      a: 1\n";
        let model: ModelDefinition = io::from_str(yaml, Format::Yaml).unwrap();
        assert_eq!(model.transitions[0].rate, Rate::mass_action(1.0));
        assert!(model.build().is_ok());
    }

    #[test]
    fn undeclared_place_is_reported_by_name() {
        let mut model: ModelDefinition = io::from_str(TRANSCRIBE, Format::Json).unwrap();
        model.transitions[0].produce.insert("protein".into(), 1);
        match model.build() {
            Err(ModelError::UndeclaredPlace { transition, place }) => {
                assert_eq!(transition, "transcribe");
                assert_eq!(place, "protein");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_weight_surfaces_net_error() {
        let mut model: ModelDefinition = io::from_str(TRANSCRIBE, Format::Json).unwrap();
        model.transitions[0].consume.insert("mRNA".into(), 0);
        assert!(matches!(
            model.build(),
            Err(ModelError::Net(NetError::InvalidWeight { weight: 0, .. }))
        ));
    }

    #[test]
    fn from_net_is_lossless() {
        let mut model: ModelDefinition = io::from_str(TRANSCRIBE, Format::Json).unwrap();
        model.conservation.push(LawDef {
            name: "gene".into(),
            weights: [("gene".to_string(), 1)].into_iter().collect(),
        });
        let net = model.build().unwrap();
        assert_eq!(ModelDefinition::from_net(&net).unwrap(), model);
    }

    #[test]
    fn custom_rates_cannot_be_exported() {
        let mut net = Net::empty();
        net.add_transition("hill", Rate::custom(|_| 1.0)).unwrap();
        net.freeze().unwrap();
        assert!(matches!(
            ModelDefinition::from_net(&net),
            Err(ModelError::UnserializableRate(name)) if name == "hill"
        ));
    }

    #[test]
    fn files_round_trip_in_every_format() {
        let model: ModelDefinition = io::from_str(TRANSCRIBE, Format::Json).unwrap();
        let dir = std::env::temp_dir().join(format!("mrna-pnet-model-{}", std::process::id()));
        for ext in ["json", "ron", "yaml"] {
            let path = dir.join(format!("transcribe.{ext}"));
            model.write(&path).unwrap();
            assert_eq!(ModelDefinition::read(&path).unwrap(), model, "{ext}");
        }
        assert!(ModelDefinition::load_net(dir.join("transcribe.json")).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

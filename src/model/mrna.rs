//! mRNA 翻译模型构建器。
//!
//! 每条链长度为 `N` 的氨基酸序列展开为位置库所 `p_<chain>_0 ..= p_<chain>_N`，
//! 迁移 `t_<chain>_t<k>` 消耗位置 `k-1` 与第 `k` 个残基对应的氨基酸库所
//! `p_<letter>`，产生位置 `k`；最后一个迁移同时产生蛋白 `p_<polipeptide>`。
//! 启用核糖体时，`t1` 占用一个 `p_free_ribosomes`，`tN` 将其释放。
use serde::{Deserialize, Serialize};
use thiserror::Error;

use indexmap::IndexMap;

use crate::model::{LawDef, ModelDefinition, ModelError, TransitionDef};
use crate::net::{Net, Rate, Weight};

pub const FREE_RIBOSOMES: &str = "p_free_ribosomes";
const DEFAULT_RIBOSOMES: Weight = 50;

#[derive(Debug, Error)]
pub enum MrnaError {
    #[error("chain `{0}` has an empty sequence")]
    EmptySequence(String),
    #[error("chain `{chain}` has invalid residue {residue:?} at position {position}")]
    InvalidResidue {
        chain: String,
        position: usize,
        residue: char,
    },
    #[error("invalid simulation parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub name: String,
    pub sequence: String,
    pub polipeptide_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RibosomeParameters {
    pub initial_ribosomes: Weight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub initial_chains_marking: Weight,
    pub max_protein_output_goal: Weight,
    #[serde(default = "default_excess")]
    pub excess_aminoacids_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ribosome_parameters: Option<RibosomeParameters>,
    /// Older spelling of `ribosome_parameters.initial_ribosomes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_free_ribosomes: Option<Weight>,
    /// Mass-action constant of every elongation step.
    #[serde(default = "default_elongation_rate")]
    pub elongation_rate: f64,
}

fn default_excess() -> f64 {
    1.0
}

fn default_elongation_rate() -> f64 {
    1.0
}

impl SimulationParameters {
    pub fn initial_ribosomes(&self) -> Weight {
        self.ribosome_parameters
            .as_ref()
            .map(|r| r.initial_ribosomes)
            .or(self.initial_free_ribosomes)
            .unwrap_or(DEFAULT_RIBOSOMES)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrnaInput {
    pub chains: Vec<Chain>,
    pub simulation_parameters: SimulationParameters,
}

pub fn position_place(chain: &str, k: usize) -> String {
    format!("p_{chain}_{k}")
}

pub fn amino_acid_place(residue: char) -> String {
    format!("p_{residue}")
}

pub fn protein_place(polipeptide: &str) -> String {
    format!("p_{polipeptide}")
}

pub fn step_transition(chain: &str, k: usize) -> String {
    format!("t_{chain}_t{k}")
}

impl MrnaInput {
    fn residues(chain: &Chain) -> Result<Vec<char>, MrnaError> {
        let residues: Vec<char> = chain.sequence.trim().chars().collect();
        if residues.is_empty() {
            return Err(MrnaError::EmptySequence(chain.name.clone()));
        }
        residues
            .into_iter()
            .enumerate()
            .map(|(position, residue)| {
                if residue.is_ascii_alphabetic() {
                    Ok(residue.to_ascii_uppercase())
                } else {
                    Err(MrnaError::InvalidResidue {
                        chain: chain.name.clone(),
                        position: position + 1,
                        residue,
                    })
                }
            })
            .collect()
    }

    fn check_parameters(&self) -> Result<(), MrnaError> {
        let params = &self.simulation_parameters;
        if !params.excess_aminoacids_factor.is_finite() || params.excess_aminoacids_factor < 0.0 {
            return Err(MrnaError::InvalidParameter(format!(
                "excess_aminoacids_factor must be finite and non-negative, got {}",
                params.excess_aminoacids_factor
            )));
        }
        if !params.elongation_rate.is_finite() || params.elongation_rate <= 0.0 {
            return Err(MrnaError::InvalidParameter(format!(
                "elongation_rate must be finite and positive, got {}",
                params.elongation_rate
            )));
        }
        Ok(())
    }

    /// Expands the chains into a named model. `ribosomes` gates initiation
    /// on the free-ribosome pool.
    pub fn to_model(&self, ribosomes: bool) -> Result<ModelDefinition, MrnaError> {
        self.check_parameters()?;
        let params = &self.simulation_parameters;
        let rate = Rate::mass_action(params.elongation_rate);

        let mut places: IndexMap<String, Weight> = IndexMap::new();
        let mut amino_acids: IndexMap<char, u64> = IndexMap::new();
        let mut proteins: Vec<String> = Vec::new();
        let mut transitions = Vec::new();
        let mut conservation = Vec::new();
        let mut in_flight: IndexMap<String, Weight> = IndexMap::new();

        for chain in &self.chains {
            let residues = Self::residues(chain)?;
            let n = residues.len();
            let protein = protein_place(&chain.polipeptide_name);

            for k in 0..=n {
                let tokens = if k == 0 { params.initial_chains_marking } else { 0 };
                places.insert(position_place(&chain.name, k), tokens);
            }
            conservation.push(LawDef {
                name: format!("{}_chains", chain.name),
                weights: (0..=n).map(|k| (position_place(&chain.name, k), 1)).collect(),
            });
            if ribosomes {
                in_flight.extend((1..n).map(|k| (position_place(&chain.name, k), 1)));
            }

            for (idx, &residue) in residues.iter().enumerate() {
                let k = idx + 1;
                *amino_acids.entry(residue).or_insert(0) += 1;

                let mut consume = IndexMap::new();
                consume.insert(position_place(&chain.name, k - 1), 1);
                *consume.entry(amino_acid_place(residue)).or_insert(0) += 1;
                let mut produce = IndexMap::new();
                produce.insert(position_place(&chain.name, k), 1);
                if k == n {
                    produce.insert(protein.clone(), 1);
                }
                if ribosomes && k == 1 {
                    consume.insert(FREE_RIBOSOMES.to_string(), 1);
                }
                if ribosomes && k == n {
                    produce.insert(FREE_RIBOSOMES.to_string(), 1);
                }
                transitions.push(TransitionDef {
                    name: step_transition(&chain.name, k),
                    rate: rate.clone(),
                    consume,
                    produce,
                });
            }
            if !proteins.contains(&protein) {
                proteins.push(protein);
            }
        }

        let scale = params.max_protein_output_goal as f64 * params.excess_aminoacids_factor;
        for (&residue, &count) in &amino_acids {
            places.insert(amino_acid_place(residue), (count as f64 * scale).round() as Weight);
        }
        for protein in proteins {
            if places.contains_key(&protein) {
                return Err(MrnaError::InvalidParameter(format!(
                    "protein place `{protein}` collides with another place"
                )));
            }
            places.insert(protein, 0);
        }
        if ribosomes {
            if places.contains_key(FREE_RIBOSOMES) {
                return Err(MrnaError::InvalidParameter(format!(
                    "`{FREE_RIBOSOMES}` is already used by a chain or protein"
                )));
            }
            let initial = params.initial_ribosomes();
            places.insert(FREE_RIBOSOMES.to_string(), initial);
            in_flight.insert(FREE_RIBOSOMES.to_string(), 1);
            conservation.push(LawDef {
                name: "ribosomes".to_string(),
                weights: in_flight,
            });
        }

        Ok(ModelDefinition {
            places,
            transitions,
            conservation,
        })
    }

    pub fn build_net(&self, ribosomes: bool) -> Result<Net, MrnaError> {
        Ok(self.to_model(ribosomes)?.build()?)
    }
}

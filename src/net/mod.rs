//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设离散库所集合 `P` 与迁移集合 `T`。定义输入/输出映射
//! `Pre, Post ∈ ℕ^{|P|×|T|}`，以及迁移效应矩阵 `C = Post - Pre`。对任意标识
//! `M ∈ ℕ^{|P|}`：
//!
//! * 迁移 `t ∈ T` **可激发** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`；
//! * 迁移 **发生** 后标识满足 `M' = M + C[:, t]`；
//! * 每个迁移携带一个速率 [`Rate`]，在随机仿真中给出倾向 `a_t(M)`。
//!
//! 网在 `freeze()` 之前可增量构建，之后只读，可跨线程共享。
//!
//! ## 示例
//!
//! ```rust
//! use mrna_pnet::net::*;
//!
//! let mut net = Net::empty();
//! let mrna = net.add_place("mRNA", 1).unwrap();
//! let protein = net.add_place("protein", 0).unwrap();
//! let translate = net.add_transition("translate", Rate::mass_action(1.0)).unwrap();
//!
//! net.add_arc(mrna, translate, ArcDirection::PlaceToTransition, 1).unwrap();
//! net.add_arc(protein, translate, ArcDirection::TransitionToPlace, 1).unwrap();
//! net.freeze().unwrap();
//!
//! let marking = net.initial_marking();
//! let next = marking.apply(translate, &net).unwrap();
//! assert_eq!(next.get(mrna), 0);
//! assert_eq!(next.get(protein), 1);
//! ```

pub mod conservation;
pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod marking;
pub mod rate;
pub mod structure;

pub use conservation::ConservationLaw;
pub use self::core::{DiagnosticReport, Net, NetError};
pub use ids::{PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use marking::{FireError, Marking};
pub use rate::{Rate, RateFn};
pub use structure::{Arc, ArcDirection, Place, Transition, Weight};

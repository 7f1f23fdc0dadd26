//! # 随机 Petri 网仿真
//!
//! 由可激发集计算、发生调度、轨迹记录与仿真驱动组成。网在仿真期间只读，
//! 每次运行独占标识、时钟与随机数发生器（`ChaCha8Rng`，按种子可复现）。
pub mod driver;
pub mod enabling;
pub mod ensemble;
pub mod error;
pub mod scheduler;
pub mod trajectory;

pub use driver::{CancelToken, RunOutcome, Simulation, StopReason, derive_seeds};
pub use enabling::{enabled, is_enabled};
pub use ensemble::{EnsembleSummary, PlaceStats};
pub use error::SimError;
pub use scheduler::{Decision, FiringPolicy, Scheduler, propensity};
pub use trajectory::{Event, Recorder, Resample, Sample, SnapshotPolicy, Trajectory};

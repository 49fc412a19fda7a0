//! Gene regulatory network inference and robustness analysis.

pub mod boost;
pub mod infer;
pub mod network;
pub mod ranking;
pub mod robustness;

pub use boost::{BoostParams, BoostedRegressor};
pub use infer::{infer_network, read_tf_list, select_regulators, InferenceParams};
pub use network::{read_edges, write_edges, NetworkStats, RegulatoryEdge, RegulatoryNetwork};
pub use ranking::{rank_disruptions, RankedDisruption};
pub use robustness::{perturbation_analysis, PerturbationResult, RobustnessParams};

pub mod replay;
pub mod reports;
pub mod seeds;
pub mod simulation;

pub use replay::{load_replay, run_replay};
pub use reports::{RunReport, build_report};
pub use seeds::resolve_seeds;
pub use simulation::{RunSummary, run_simulation};

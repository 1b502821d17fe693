mod controller;
mod loop_worker;

pub use controller::ReplayController;
pub use loop_worker::{replay_loop, ReplaySummary};

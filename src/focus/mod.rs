pub mod heuristic;
pub mod navigator;

pub mod combat;
pub mod config;
pub mod dice;
pub mod engine;
pub mod graph;
pub mod lint;
pub mod session;

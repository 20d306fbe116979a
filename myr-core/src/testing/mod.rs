//! Deterministic test doubles for position and stop lifecycle tests

pub mod sim_gateway;

pub use sim_gateway::SimGateway;

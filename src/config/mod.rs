// src/config/mod.rs
pub mod advisor;

pub use advisor::AdvisorConfig;

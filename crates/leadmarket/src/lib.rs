//! Core library for the home-energy lead marketplace: lead lifecycle,
//! refund workflow with risk scoring, and broker health scoring.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;

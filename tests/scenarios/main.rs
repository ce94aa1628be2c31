//! Scenario-based tests for pstasks

mod helpers;

mod environment_gating;
mod config_resolution;
mod failure_handling;
mod local_build;

//! Preparation and validation of SKIRT radiative-transfer inputs from a
//! cosmological zoom-in snapshot.
//!
//! Stages communicate only through files in a run directory: ingestion writes
//! the particle tables and `meta.json`, then view generation, camera
//! derivation and configuration assembly follow, and the validator checks the
//! artifacts before and after the simulator runs.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;

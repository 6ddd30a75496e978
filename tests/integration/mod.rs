//! Integration test suite for CMAM
//!
//! End-to-end tests of the lifecycle engine, the auditor and the `cmam`
//! binary. Library-level tests drive the engine against the in-memory
//! remote from `cmam_cli::test_utils`; CLI tests run the real binary against
//! a temporary install root and never touch the network.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **lifecycle**: install/update/repair/uninstall scenarios and atomicity
//! - **rollback**: backup chain and rollback reversibility
//! - **batch**: `update --all` isolation and snapshot import
//! - **audit**: validate, trust, doctor and clean over a tampered root
//! - **self_update**: replacing the manager binary
//! - **cli**: command-line behavior and exit codes

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod audit;
mod batch;
mod cli;
mod lifecycle;
mod rollback;
mod self_update;

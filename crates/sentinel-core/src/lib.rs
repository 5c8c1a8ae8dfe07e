//! Platform Sentinel core
//!
//! Health-check and self-healing engine for the compliance platform. A single
//! invocation probes every configured surface concurrently, classifies the
//! failures it finds, runs bounded remediation actions and records the
//! outcome for audit.
//!
//! # Pipeline
//!
//! ```text
//! probes (parallel) -> raw batch -> classifier -> remediation -> final batch
//!                                                              -> summary -> audit (best-effort)
//! ```
//!
//! # Design Principles
//! - Stateless: every invocation is a self-contained transaction
//! - Bounded: one retry per failing check, every action under a deadline
//! - Non-throwing: probe and remediation errors become structured results

pub mod audit;
pub mod config;
pub mod contracts;
pub mod delay;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod probes;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod triggers;

pub use config::SentinelConfig;
pub use contracts::*;
pub use engine::{RunOptions, SentinelEngine};
pub use error::{ConfigError, PersistenceError, ProbeError, RemediationError};

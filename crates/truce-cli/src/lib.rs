//! # truce-cli: Command-Line Interface for the Dispute Engine
//!
//! Provides the `truce` binary. Handlers delegate to `truce-dispute`; no
//! dispute logic lives here.
//!
//! ## Subcommands
//!
//! - `truce simulate`: Run a YAML scenario against an in-memory engine.
//! - `truce policy`: Evaluate split, fee, escalation and subsidy arithmetic.
//! - `truce config`: Validate a configuration file or print the defaults.
//!
//! ```bash
//! truce simulate scenarios/deadlock-timeout.yaml
//! truce --config engine.yaml policy timeout-split --stake 1000
//! truce config check engine.yaml
//! ```

pub mod config;
pub mod policy;
pub mod scenario;
pub mod simulate;

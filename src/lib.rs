//! figma-sync: Incremental Design Asset Sync
//!
//! Extracts color tokens and icon assets from a design document tree and keeps
//! local artifacts in step with it. A persisted ledger records the last derived
//! value per icon node and per color name, so repeated runs download and
//! regenerate only what changed.

pub mod client;
pub mod color;
pub mod config;
pub mod document;
pub mod error;
pub mod icons;
pub mod ledger;
pub mod logging;
pub mod naming;
pub mod sync;
pub mod tooling;
pub mod tree;
pub mod types;

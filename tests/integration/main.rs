//! Integration tests for figma-sync

mod ledger_persistence;
mod sync_pipeline;
mod tree_search_properties;

//! Design API collaborator
//!
//! The engine only needs three capabilities from the remote service; everything
//! else about HTTP lives behind this trait.

pub mod figma;

pub use figma::FigmaClient;

use crate::document::Document;
use crate::error::TransportError;
use crate::icons::IconFormat;
use crate::types::NodeId;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait DesignApi: Send + Sync {
    /// Fetch and parse the full document tree for `file_key`.
    async fn fetch_document(&self, file_key: &str) -> Result<Document, TransportError>;

    /// Resolve rendered image locators for a batch of nodes.
    ///
    /// Nodes the service could not render are absent from the returned map.
    async fn fetch_image_locators(
        &self,
        file_key: &str,
        node_ids: &[NodeId],
        format: IconFormat,
        scale: f32,
    ) -> Result<HashMap<NodeId, String>, TransportError>;

    /// Download raw bytes from a locator.
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError>;
}

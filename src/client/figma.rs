//! reqwest-backed client for the Figma REST API.

use crate::client::DesignApi;
use crate::document::Document;
use crate::error::TransportError;
use crate::icons::IconFormat;
use crate::types::NodeId;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.figma.com";

/// Maximum node ids per image request
const IMAGE_BATCH_SIZE: usize = 100;

pub struct FigmaClient {
    client: Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    images: HashMap<String, Option<String>>,
}

impl FigmaClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn get_api(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        let resp = self
            .client
            .get(url)
            .header("X-Figma-Token", &self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    fn images_url(&self, file_key: &str, ids: &[NodeId], format: IconFormat, scale: f32) -> String {
        format!(
            "{}/v1/images/{}?ids={}&format={}&scale={}",
            self.api_base,
            file_key,
            ids.join(","),
            format.as_str(),
            scale
        )
    }
}

#[async_trait]
impl DesignApi for FigmaClient {
    async fn fetch_document(&self, file_key: &str) -> Result<Document, TransportError> {
        let url = format!("{}/v1/files/{}", self.api_base, file_key);
        let body = self.get_api(&url).await?.text().await?;
        debug!(file_key, bytes = body.len(), "Fetched document");
        Document::from_json(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn fetch_image_locators(
        &self,
        file_key: &str,
        node_ids: &[NodeId],
        format: IconFormat,
        scale: f32,
    ) -> Result<HashMap<NodeId, String>, TransportError> {
        let mut locators = HashMap::new();
        for chunk in node_ids.chunks(IMAGE_BATCH_SIZE) {
            let url = self.images_url(file_key, chunk, format, scale);
            let resp: ImagesResponse = self.get_api(&url).await?.json().await?;
            if let Some(err) = resp.err {
                return Err(TransportError::Decode(format!("image service error: {}", err)));
            }
            locators.extend(
                resp.images
                    .into_iter()
                    .filter_map(|(id, locator)| locator.map(|l| (id, l))),
            );
            debug!(requested = chunk.len(), resolved = locators.len(), "Resolved image batch");
        }
        Ok(locators)
    }

    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError> {
        let resp = self.client.get(locator).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: locator.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

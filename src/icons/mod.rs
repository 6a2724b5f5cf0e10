//! Icon Collector
//!
//! Locates icon source nodes, resolves a rendered image locator for each, and
//! deduplicates by derived file name. Traversal order decides which duplicate
//! survives: the first one found is kept.

use crate::client::DesignApi;
use crate::document::{Document, Node};
use crate::error::SyncError;
use crate::naming::{to_camel_case, to_snake_case};
use crate::tree::{find_by_kind, find_by_name_pattern, NamePattern};
use crate::types::{NodeId, KIND_COMPONENT, KIND_INSTANCE};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Image format requested from the render endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconFormat {
    Svg,
    Png,
    Jpg,
    Pdf,
}

impl IconFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconFormat::Svg => "svg",
            IconFormat::Png => "png",
            IconFormat::Jpg => "jpg",
            IconFormat::Pdf => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl Default for IconFormat {
    fn default() -> Self {
        IconFormat::Svg
    }
}

impl fmt::Display for IconFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IconFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(IconFormat::Svg),
            "png" => Ok(IconFormat::Png),
            "jpg" | "jpeg" => Ok(IconFormat::Jpg),
            "pdf" => Ok(IconFormat::Pdf),
            other => Err(format!(
                "Invalid icon format: {} (must be 'svg', 'png', 'jpg' or 'pdf')",
                other
            )),
        }
    }
}

/// A node selected as an icon source with its resolved locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconCandidate {
    pub node_id: NodeId,
    /// Raw node name the derived names come from
    pub name: String,
    pub variable_name: String,
    pub file_name: String,
    pub remote_locator: String,
    pub format: IconFormat,
}

/// A candidate dropped because an earlier one derived the same file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDuplicate {
    pub node_id: NodeId,
    pub file_name: String,
    /// Node that claimed the file name first
    pub kept_node_id: NodeId,
}

/// Outcome of one icon extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IconExtraction {
    pub candidates: Vec<IconCandidate>,
    pub skipped_duplicates: Vec<SkippedDuplicate>,
    /// Nodes dropped because the render service returned no locator
    pub unresolved: Vec<NodeId>,
}

/// Parameters of an icon extraction
#[derive(Debug, Clone)]
pub struct IconQuery {
    pub file_key: String,
    pub container_pattern: NamePattern,
    pub format: IconFormat,
    pub scale: f32,
}

impl IconQuery {
    pub fn new(file_key: impl Into<String>, container_pattern: &str, format: IconFormat) -> Self {
        Self {
            file_key: file_key.into(),
            container_pattern: NamePattern::new(container_pattern),
            format,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// Derived file name for an icon node name
pub fn icon_file_name(name: &str, format: IconFormat) -> String {
    format!("{}.{}", to_snake_case(name), format.extension())
}

/// Icon source nodes in discovery order, without locator resolution.
///
/// Containers are nodes whose name matches `pattern`; when none match, every
/// COMPONENT in the document is its own container. Within each container all
/// COMPONENT nodes come first, then all INSTANCE nodes. A node reachable from
/// several containers is listed once, at its first position.
pub fn collect_icon_nodes<'a>(document: &'a Document, pattern: &NamePattern) -> Vec<&'a Node> {
    let mut containers = find_by_name_pattern(&document.root, pattern);
    if containers.is_empty() {
        debug!(
            pattern = pattern.as_str(),
            "No icon container matched, falling back to all components"
        );
        containers = find_by_kind(&document.root, KIND_COMPONENT);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::new();
    for container in containers {
        let found = find_by_kind(container, KIND_COMPONENT)
            .into_iter()
            .chain(find_by_kind(container, KIND_INSTANCE));
        for node in found {
            if seen.insert(node.id.as_str()) {
                nodes.push(node);
            }
        }
    }
    nodes
}

/// Keep the first candidate per file name; later ones are reported as skipped.
pub fn dedupe_by_file_name(candidates: Vec<IconCandidate>) -> (Vec<IconCandidate>, Vec<SkippedDuplicate>) {
    let mut claimed: HashMap<String, NodeId> = HashMap::new();
    let mut kept = Vec::new();
    let mut skipped = Vec::new();

    for candidate in candidates {
        if let Some(owner) = claimed.get(&candidate.file_name) {
            debug!(
                node_id = %candidate.node_id,
                file_name = %candidate.file_name,
                kept_node_id = %owner,
                "Skipping duplicate icon"
            );
            skipped.push(SkippedDuplicate {
                node_id: candidate.node_id,
                file_name: candidate.file_name,
                kept_node_id: owner.clone(),
            });
            continue;
        }
        claimed.insert(candidate.file_name.clone(), candidate.node_id.clone());
        kept.push(candidate);
    }
    (kept, skipped)
}

/// Locate, resolve and deduplicate icon candidates.
///
/// A failed locator lookup fails the whole call; no partial result is returned.
pub async fn extract_icons(
    api: &dyn DesignApi,
    document: &Document,
    query: &IconQuery,
) -> Result<IconExtraction, SyncError> {
    let nodes = collect_icon_nodes(document, &query.container_pattern);
    if nodes.is_empty() {
        info!("No icon candidates found");
        return Ok(IconExtraction::default());
    }

    let node_ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let locators = api
        .fetch_image_locators(&query.file_key, &node_ids, query.format, query.scale)
        .await
        .map_err(SyncError::Extraction)?;

    let mut unresolved = Vec::new();
    let mut resolved = Vec::with_capacity(nodes.len());
    for node in nodes {
        match locators.get(&node.id).filter(|l| !l.trim().is_empty()) {
            Some(locator) => resolved.push(IconCandidate {
                node_id: node.id.clone(),
                name: node.name.clone(),
                variable_name: to_camel_case(&node.name),
                file_name: icon_file_name(&node.name, query.format),
                remote_locator: locator.clone(),
                format: query.format,
            }),
            None => {
                warn!(node_id = %node.id, name = %node.name, "No image locator for icon, dropping");
                unresolved.push(node.id.clone());
            }
        }
    }

    let (candidates, skipped_duplicates) = dedupe_by_file_name(resolved);
    info!(
        candidates = candidates.len(),
        duplicates = skipped_duplicates.len(),
        unresolved = unresolved.len(),
        "Collected icons"
    );
    Ok(IconExtraction {
        candidates,
        skipped_duplicates,
        unresolved,
    })
}

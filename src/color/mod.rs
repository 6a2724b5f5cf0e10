//! Color Resolver
//!
//! Associates each named fill style with the concrete color found on the first
//! node that uses it, then picks up untagged nodes carrying solid fills directly.
//! Style-derived entries take priority over node-derived ones with the same name.

use crate::document::{Document, RawColor};
use crate::naming::to_camel_case;
use crate::tree::find_first;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// RGBA color with channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorValue {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorValue {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Channel scaled to a byte, rounded to nearest.
    fn channel_byte(value: f64) -> u8 {
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// ARGB hex literal, alpha first, uppercase: `0xAARRGGBB`
    pub fn to_hex(&self) -> String {
        format!(
            "0x{:02X}{:02X}{:02X}{:02X}",
            Self::channel_byte(self.a),
            Self::channel_byte(self.r),
            Self::channel_byte(self.g),
            Self::channel_byte(self.b),
        )
    }
}

impl From<RawColor> for ColorValue {
    fn from(raw: RawColor) -> Self {
        Self::new(raw.r, raw.g, raw.b, raw.a)
    }
}

/// Where a resolved color came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    Style,
    Node,
}

/// One resolved color token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorEntry {
    /// Derived variable name (map key)
    pub name: String,
    /// Style name or node name the variable was derived from
    pub original_name: String,
    pub value: ColorValue,
    pub hex: String,
    pub source: ColorSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColorEntry {
    fn new(
        original_name: &str,
        value: ColorValue,
        source: ColorSource,
        description: Option<String>,
    ) -> Self {
        Self {
            name: to_camel_case(original_name),
            original_name: original_name.to_string(),
            hex: value.to_hex(),
            value,
            source,
            description: description.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Resolve every color token in the document, keyed by variable name.
pub fn extract_colors(document: &Document) -> BTreeMap<String, ColorEntry> {
    let mut colors = BTreeMap::new();

    for (style_id, style) in document.fill_styles() {
        let Some(node) = find_first(&document.root, |n| n.fill_style() == Some(style_id.as_str()))
        else {
            trace!(style_id = %style_id, style = %style.name, "Fill style is not used by any node");
            continue;
        };
        let Some(raw) = node.first_solid_color() else {
            trace!(style_id = %style_id, node_id = %node.id, "Styled node has no solid fill");
            continue;
        };
        let entry = ColorEntry::new(
            &style.name,
            raw.into(),
            ColorSource::Style,
            style.description.clone(),
        );
        if colors.contains_key(&entry.name) {
            debug!(name = %entry.name, style = %style.name, "Dropping color with colliding name");
            continue;
        }
        colors.insert(entry.name.clone(), entry);
    }

    for node in document.root.walk() {
        if node.fill_style().is_some() {
            continue;
        }
        let Some(raw) = node.first_solid_color() else {
            continue;
        };
        let entry = ColorEntry::new(&node.name, raw.into(), ColorSource::Node, None);
        if colors.contains_key(&entry.name) {
            trace!(name = %entry.name, node_id = %node.id, "Color name already taken");
            continue;
        }
        colors.insert(entry.name.clone(), entry);
    }

    debug!(count = colors.len(), "Resolved colors");
    colors
}

//! Document Model
//!
//! Immutable tree of design nodes as returned by the design-tool file endpoint.
//! Parents own their children; child order is preserved exactly as fetched.

use crate::types::{NodeId, StyleId, FILL_SOLID, STYLE_SLOT_FILL};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Raw RGBA payload of a fill, channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "default_alpha")]
    pub a: f64,
}

fn default_alpha() -> f64 {
    1.0
}

/// Fill descriptor attached to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Paint type (`SOLID`, `GRADIENT_LINEAR`, `IMAGE`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<RawColor>,
}

impl Fill {
    pub fn solid(color: RawColor) -> Self {
        Self {
            kind: FILL_SOLID.to_string(),
            color: Some(color),
        }
    }

    /// Concrete color if this is a solid fill carrying one.
    pub fn solid_color(&self) -> Option<RawColor> {
        if self.kind == FILL_SOLID {
            self.color
        } else {
            None
        }
    }
}

/// A single element of the design document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    #[serde(default)]
    pub name: String,

    /// Node type (`DOCUMENT`, `FRAME`, `COMPONENT`, `INSTANCE`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub children: Vec<Node>,

    #[serde(default, rename = "fills", skip_serializing_if = "Option::is_none")]
    pub fill_data: Option<Vec<Fill>>,

    /// Style slot → style id
    #[serde(default, rename = "styles", skip_serializing_if = "Option::is_none")]
    pub style_refs: Option<HashMap<String, StyleId>>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            children: Vec::new(),
            fill_data: None,
            style_refs: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_fills(mut self, fills: Vec<Fill>) -> Self {
        self.fill_data = Some(fills);
        self
    }

    pub fn with_style(mut self, slot: &str, style_id: impl Into<String>) -> Self {
        self.style_refs
            .get_or_insert_with(HashMap::new)
            .insert(slot.to_string(), style_id.into());
        self
    }

    /// Style id referenced through the `fill` slot, if any
    pub fn fill_style(&self) -> Option<&str> {
        self.style_refs
            .as_ref()
            .and_then(|refs| refs.get(STYLE_SLOT_FILL))
            .map(String::as_str)
    }

    /// First solid fill with a concrete color payload
    pub fn first_solid_color(&self) -> Option<RawColor> {
        self.fill_data
            .as_ref()?
            .iter()
            .find_map(Fill::solid_color)
    }
}

/// Kind of a document-wide style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StyleKind {
    Fill,
    Text,
    Effect,
    Grid,
    #[serde(other)]
    Other,
}

/// Named, reusable style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    #[serde(default)]
    pub key: String,

    pub name: String,

    #[serde(rename = "styleType")]
    pub kind: StyleKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A fetched design document: root node plus the style table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "document")]
    pub root: Node,

    /// Style id → descriptor, ordered by id
    #[serde(default)]
    pub styles: BTreeMap<StyleId, StyleDescriptor>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self {
            name: String::new(),
            root,
            styles: BTreeMap::new(),
        }
    }

    /// Empty document: a bare root with no children and no styles
    pub fn empty() -> Self {
        Self::new(Node::new("0:0", "Document", "DOCUMENT"))
    }

    pub fn with_style(mut self, style_id: impl Into<String>, style: StyleDescriptor) -> Self {
        self.styles.insert(style_id.into(), style);
        self
    }

    /// Parse the JSON body of the file endpoint.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Fill styles in style-id order
    pub fn fill_styles(&self) -> impl Iterator<Item = (&StyleId, &StyleDescriptor)> {
        self.styles
            .iter()
            .filter(|(_, style)| style.kind == StyleKind::Fill)
    }
}

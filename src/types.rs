//! Core types shared across the extraction and change-detection engine.

/// NodeId: identifier of a node inside one fetched design document (e.g. `"12:345"`)
pub type NodeId = String;

/// StyleId: identifier of a document-wide style (e.g. `"S:abc123"`)
pub type StyleId = String;

/// ContentHash: hex-encoded digest of a local artifact's raw bytes
pub type ContentHash = String;

/// Node kind of reusable component definitions
pub const KIND_COMPONENT: &str = "COMPONENT";

/// Node kind of placed component instances
pub const KIND_INSTANCE: &str = "INSTANCE";

/// Fill descriptor type carrying a single flat color
pub const FILL_SOLID: &str = "SOLID";

/// Style slot key used by nodes to reference a fill style
pub const STYLE_SLOT_FILL: &str = "fill";

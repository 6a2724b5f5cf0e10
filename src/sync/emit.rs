//! Dart source emission for colors and icons.

use crate::color::ColorEntry;
use crate::icons::IconCandidate;
use std::collections::BTreeMap;

const HEADER: &str = "// GENERATED BY figma-sync. DO NOT EDIT.\n";

/// `AppColors` class with one constant per color, sorted by name.
pub fn render_colors_dart(colors: &BTreeMap<String, ColorEntry>) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\nimport 'package:flutter/widgets.dart';\n\n");
    out.push_str("class AppColors {\n  AppColors._();\n");
    for (name, entry) in colors {
        out.push('\n');
        out.push_str(&format!("  /// {}\n", entry.original_name));
        if let Some(description) = &entry.description {
            for line in description.lines() {
                out.push_str(&format!("  /// {}\n", line.trim_end()));
            }
        }
        out.push_str(&format!(
            "  static const Color {} = Color({});\n",
            name, entry.hex
        ));
    }
    out.push_str("}\n");
    out
}

/// `AppIcons` class mapping each icon variable to its asset path.
///
/// A later candidate whose variable name is already taken is left out.
pub fn render_icons_dart(candidates: &[IconCandidate], asset_prefix: &str) -> String {
    let prefix = asset_prefix.trim_end_matches('/');
    let mut by_name: BTreeMap<&str, &IconCandidate> = BTreeMap::new();
    for candidate in candidates {
        by_name
            .entry(candidate.variable_name.as_str())
            .or_insert(candidate);
    }

    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\nclass AppIcons {\n  AppIcons._();\n\n");
    for (name, candidate) in by_name {
        let path = if prefix.is_empty() {
            candidate.file_name.clone()
        } else {
            format!("{}/{}", prefix, candidate.file_name)
        };
        out.push_str(&format!("  static const String {} = '{}';\n", name, path));
    }
    out.push_str("}\n");
    out
}

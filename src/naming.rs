//! Derived-name rules for generated identifiers and file names.
//!
//! Names are split into words on `/`, `-`, `_`, `.`, whitespace, any other
//! non-alphanumeric character, and lower-to-upper case boundaries. Output that
//! would be empty becomes [`FALLBACK_NAME`]; output starting with a digit is
//! prefixed with [`NUMERIC_PREFIX`].

/// Substitute for names with no usable characters
pub const FALLBACK_NAME: &str = "unnamed";

/// Prefix for names whose first character is a digit
pub const NUMERIC_PREFIX: &str = "n";

/// Split a raw design name into words.
pub fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in input.chars() {
        if !ch.is_alphanumeric() {
            // '/', '-', '_', '.', whitespace and any other punctuation
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn finish(name: String) -> String {
    match name.chars().next() {
        None => FALLBACK_NAME.to_string(),
        Some(first) if first.is_numeric() => format!("{}{}", NUMERIC_PREFIX, name),
        Some(_) => name,
    }
}

/// `Brand / Primary-500` → `brandPrimary500`
pub fn to_camel_case(input: &str) -> String {
    let words = split_words(input);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    finish(out)
}

/// `brand/primary-500` → `BrandPrimary500`
pub fn to_pascal_case(input: &str) -> String {
    let out: String = split_words(input).iter().map(|w| capitalize(w)).collect();
    finish(out)
}

/// `Icon/ArrowLeft` → `icon_arrow_left`
pub fn to_snake_case(input: &str) -> String {
    let out = split_words(input)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    finish(out)
}

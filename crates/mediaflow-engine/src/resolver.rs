//! Placeholder token resolution.
//!
//! Property strings may embed `{nodeName.output}` tokens referencing
//! another node's prior output. The resolver rewrites those tokens to
//! literal text; it never triggers execution itself — the executor is
//! responsible for resolving dependencies before substitution runs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{NodeOutput, PropertyMap};

// Strict {name.output} grammar; nested or unbalanced braces don't match.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\.output\}").expect("placeholder pattern is valid"));

/// Rewrite every `{name.output}` token in `input` using `lookup`.
///
/// Each occurrence is independently resolved in a single left-to-right
/// pass. Tokens whose name has no available output are left verbatim
/// and logged; they never abort resolution.
pub fn resolve_placeholders<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<NodeOutput>,
{
    PLACEHOLDER_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match lookup(name) {
                Some(output) => output.substitution_text(),
                None => {
                    log::warn!(
                        "Placeholder '{{{}.output}}' has no available output; leaving token unresolved",
                        name
                    );
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Apply placeholder resolution to every string-valued property.
///
/// Non-string values pass through untouched.
pub fn resolve_properties<F>(properties: &PropertyMap, lookup: F) -> PropertyMap
where
    F: Fn(&str) -> Option<NodeOutput>,
{
    properties
        .iter()
        .map(|(key, value)| match value.as_str() {
            Some(text) => (
                key.clone(),
                serde_json::Value::String(resolve_placeholders(text, &lookup)),
            ),
            None => (key.clone(), value.clone()),
        })
        .collect()
}

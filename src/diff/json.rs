//! Structural diff over parsed JSON trees.
//!
//! Both documents are re-serialized to a stable two-space-indented form
//! (one scalar per line, object keys in insertion order) and line-diffed,
//! so the emitted chunks line up at key/value granularity.

use serde_json::Value;

use super::DiffChunk;
use super::lines;

pub(super) fn diff_json(base: &str, compare: &str) -> Option<Vec<DiffChunk>> {
    let base_value: Value = serde_json::from_str(base).ok()?;
    let compare_value: Value = serde_json::from_str(compare).ok()?;

    let base_pretty = serde_json::to_string_pretty(&base_value).ok()?;
    let compare_pretty = serde_json::to_string_pretty(&compare_value).ok()?;

    let base_lines: Vec<&str> = base_pretty.split_inclusive('\n').collect();
    let compare_lines: Vec<&str> = compare_pretty.split_inclusive('\n').collect();
    Some(lines::diff_slices(&base_lines, &compare_lines))
}

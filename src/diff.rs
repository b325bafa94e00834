//! Order-preserving diff between two document strings.
//!
//! Mode selection follows the document shape: two JSON-shaped inputs get a
//! structural diff over the parsed trees, two plain inputs get a Myers line
//! diff, and a mixed pair (a transient state while the caller switches view
//! modes) yields an empty sequence for the caller to re-invoke later.

use serde::Serialize;

mod json;
mod lines;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Unchanged,
    Added,
    Removed,
}

/// A maximal run of text relative to the base document. `Unchanged` text is
/// byte-identical in both inputs; `Added` exists only in `compare`,
/// `Removed` only in `base`. Chunks never carry empty text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiffChunk {
    pub text: String,
    pub kind: ChunkKind,
}

pub fn diff(base: &str, compare: &str) -> Vec<DiffChunk> {
    match (base.starts_with('{'), compare.starts_with('{')) {
        (true, true) => {
            // A `{` prefix that turns out not to parse falls back to the
            // line diff; no input is allowed to make the engine fail.
            json::diff_json(base, compare).unwrap_or_else(|| lines::diff_lines(base, compare))
        }
        (false, false) => lines::diff_lines(base, compare),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;

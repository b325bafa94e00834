//! Editing model behind the header key/value widget.
//!
//! Rows are keyed by an opaque monotonically increasing index rather than
//! the header key, because keys may be transiently duplicated or empty
//! while the user is typing. The invalid flags are set only by the
//! add-validation pass and cleared on the next edit of that field.

use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
    pub key_invalid: bool,
    pub value_invalid: bool,
}

#[derive(Clone, Debug, Default)]
pub struct HeaderEditor {
    next_index: u64,
    rows: BTreeMap<u64, HeaderEntry>,
}

impl HeaderEditor {
    pub fn from_headers(headers: &BTreeMap<String, String>) -> Self {
        let mut editor = Self::default();
        for (key, value) in headers {
            let index = editor.next_index;
            editor.next_index += 1;
            editor.rows.insert(
                index,
                HeaderEntry {
                    key: key.clone(),
                    value: value.clone(),
                    ..HeaderEntry::default()
                },
            );
        }
        editor
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (u64, &HeaderEntry)> {
        self.rows.iter().map(|(index, entry)| (*index, entry))
    }

    pub fn set_key(&mut self, index: u64, key: &str) -> bool {
        match self.rows.get_mut(&index) {
            Some(entry) => {
                entry.key = key.to_string();
                entry.key_invalid = false;
                true
            }
            None => false,
        }
    }

    pub fn set_value(&mut self, index: u64, value: &str) -> bool {
        match self.rows.get_mut(&index) {
            Some(entry) => {
                entry.value = value.to_string();
                entry.value_invalid = false;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, index: u64) -> bool {
        self.rows.remove(&index).is_some()
    }

    /// Adds an empty row, unless some existing row has an empty key or
    /// value; those fields get flagged invalid and the add is refused.
    pub fn try_add(&mut self) -> Option<u64> {
        let mut blocked = false;
        for entry in self.rows.values_mut() {
            if entry.key.is_empty() {
                entry.key_invalid = true;
                blocked = true;
            }
            if entry.value.is_empty() {
                entry.value_invalid = true;
                blocked = true;
            }
        }
        if blocked {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        self.rows.insert(index, HeaderEntry::default());
        Some(index)
    }

    /// Flattens rows to the header mapping; a later row with a duplicate
    /// key wins.
    pub fn collect(&self) -> BTreeMap<String, String> {
        self.rows
            .values()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/headers_tests.rs"]
mod tests;

//! Select/expand path lists.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Derived select/expand lists for a request.
///
/// `.` and `/` are both accepted as path separators; everything is stored
/// with `/`. The selection keeps the caller's order and duplicates. The
/// expansion holds every strict prefix of every multi-segment path, first
/// occurrence first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Projection {
    selection: Vec<String>,
    expansion: IndexSet<String>,
}

impl Projection {
    pub fn build<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selection: Vec<String> = paths.into_iter().map(|p| p.as_ref().replace('.', "/")).collect();
        let mut expansion = IndexSet::new();
        for path in &selection {
            let segments: Vec<&str> = path.split('/').collect();
            for end in 1..segments.len() {
                let prefix = segments[..end].join("/");
                if !prefix.is_empty() {
                    expansion.insert(prefix);
                }
            }
        }
        Self { selection, expansion }
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn expansion(&self) -> &IndexSet<String> {
        &self.expansion
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    /// Comma-joined `$select` value, if anything is selected.
    pub fn select_param(&self) -> Option<String> {
        (!self.selection.is_empty()).then(|| self.selection.join(","))
    }

    /// Comma-joined `$expand` value, if any path needs expanding.
    pub fn expand_param(&self) -> Option<String> {
        (!self.expansion.is_empty()).then(|| self.expansion.iter().map(String::as_str).collect::<Vec<_>>().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_separator_does_not_produce_empty_prefix() {
        let projection = Projection::build(["/Owner/Name"]);
        assert_eq!(projection.expansion().iter().collect::<Vec<_>>(), vec!["/Owner"]);
    }
}

//! Ordered retrieval results.

use serde::{Deserialize, Serialize};

/// File paths in the order the retrieval result lists them.
///
/// Repetitions are kept: order and multiplicity mirror the retrieval ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedPaths(Vec<String>);

impl ExtractedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.0.push(path.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for ExtractedPaths {
    fn from(paths: Vec<String>) -> Self {
        Self(paths)
    }
}

impl<'a> IntoIterator for &'a ExtractedPaths {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ExtractedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_and_order_are_kept() {
        let paths: ExtractedPaths = ["b.py", "a.py", "b.py"].into_iter().collect();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths.as_slice(), ["b.py", "a.py", "b.py"]);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let paths: ExtractedPaths = ["x/y.py"].into_iter().collect();
        assert_eq!(serde_json::to_string(&paths).unwrap(), r#"["x/y.py"]"#);
    }
}

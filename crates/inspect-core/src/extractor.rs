//! Retrieval block extraction.
//!
//! Pulls the ranked file list out of a retrieval prompt. The list lives in a
//! block that starts right after the README and ends at the closing tag:
//!
//! ```text
//! [end of README.rst]
//! [start of astropy/modeling/separable.py]
//! ...
//! [end of astropy/modeling/separable.py]
//! [start of astropy/io/fits/header.py]
//! ...
//! </code>
//! ```
//!
//! Markers match case-insensitively.

use inspect_proto::{BlockMiss, ExtractedPaths, ExtractionMiss};

const README_MARKER: &str = "[end of readme";
const START_MARKER: &str = "[start of ";
const BLOCK_CLOSE: &str = "\n</code>";

/// Scanner for the retrieval results embedded in an instance's text.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetrievalBlockExtractor;

impl RetrievalBlockExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the retrieved paths in order of appearance.
    ///
    /// Repeated paths are returned as often as they appear.
    pub fn extract(&self, text: &str) -> Result<ExtractedPaths, ExtractionMiss> {
        let block = self.find_block(text).map_err(ExtractionMiss::NoCodeBlock)?;
        let paths = Self::scan_start_markers(block);
        if paths.is_empty() {
            return Err(ExtractionMiss::NoRetrievalResults);
        }
        Ok(paths)
    }

    /// Returns the first README-terminated block of `text`.
    ///
    /// The block runs from the line after `[end of readme...]` up to, not
    /// including, the next `\n</code>`. Candidates that are malformed or
    /// never closed are skipped; the error reports the furthest any candidate
    /// got.
    pub fn find_block<'a>(&self, text: &'a str) -> Result<&'a str, BlockMiss> {
        // ASCII lowercasing keeps byte offsets identical to `text`.
        let lowered = text.to_ascii_lowercase();
        let mut miss = BlockMiss::NoReadmeMarker;
        let mut from = 0;

        while let Some(offset) = lowered[from..].find(README_MARKER) {
            let qualifier_start = from + offset + README_MARKER.len();
            from = qualifier_start;

            let qualifier = &text[qualifier_start..];
            let Some(close) = qualifier.find(|c: char| c == ']' || c == '\n') else {
                miss = miss.max(BlockMiss::MalformedReadmeMarker);
                continue;
            };
            if qualifier.as_bytes()[close] != b']' {
                miss = miss.max(BlockMiss::MalformedReadmeMarker);
                continue;
            }

            let after_marker = qualifier_start + close + 1;
            if !text[after_marker..].starts_with('\n') {
                miss = miss.max(BlockMiss::MalformedReadmeMarker);
                continue;
            }

            let block_start = after_marker + 1;
            match text[block_start..].find(BLOCK_CLOSE) {
                Some(len) => return Ok(&text[block_start..block_start + len]),
                None => miss = miss.max(BlockMiss::UnclosedBlock),
            }
        }

        Err(miss)
    }

    /// Collects `<path>` from every newline-terminated `[start of <path>]` line.
    fn scan_start_markers(block: &str) -> ExtractedPaths {
        let mut paths = ExtractedPaths::new();
        let mut remaining = block;

        while let Some(eol) = remaining.find('\n') {
            if let Some(path) = Self::parse_start_marker(&remaining[..eol]) {
                paths.push(path);
            }
            remaining = &remaining[eol + 1..];
        }

        paths
    }

    /// Parses one line as a start marker. The path runs to the line's final `]`.
    fn parse_start_marker(line: &str) -> Option<&str> {
        let prefix = line.get(..START_MARKER.len())?;
        if !prefix.eq_ignore_ascii_case(START_MARKER) {
            return None;
        }
        line[START_MARKER.len()..].strip_suffix(']')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Result<Vec<String>, ExtractionMiss> {
        RetrievalBlockExtractor::new()
            .extract(text)
            .map(ExtractedPaths::into_inner)
    }

    #[test]
    fn test_extract_basic_block() {
        let text = "...[end of readme]\n[start of a/b.py]\nfoo\n[start of c/d.py]\nbar\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["a/b.py", "c/d.py"]);
    }

    #[test]
    fn test_extract_realistic_prompt() {
        let text = "\
<issue>
Modeling's `separability_matrix` does not compute separability correctly
</issue>
<code>
[start of README.rst]
Astropy
[end of README.rst]
[start of astropy/modeling/separable.py]
1 import numpy as np
[end of astropy/modeling/separable.py]
[start of astropy/modeling/core.py]
1 import abc
[end of astropy/modeling/core.py]
</code>
<patch>
</patch>";
        assert_eq!(
            extract(text).unwrap(),
            vec!["astropy/modeling/separable.py", "astropy/modeling/core.py"]
        );
    }

    #[test]
    fn test_duplicates_are_preserved_in_order() {
        let text = "[end of README]\n[start of x.py]\n1\n[start of y.py]\n2\n[start of x.py]\n3\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["x.py", "y.py", "x.py"]);
    }

    #[test]
    fn test_adjacent_marker_lines_are_all_collected() {
        let text = "[end of readme]\n[start of a.py]\n[start of b.py]\n[start of c.py]\nx\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        let text = "[END OF ReadMe.md]\n[Start Of src/lib.rs]\nx\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["src/lib.rs"]);
    }

    #[test]
    fn test_no_readme_marker() {
        let text = "[start of a.py]\nx\n</code>";
        assert_eq!(
            extract(text),
            Err(ExtractionMiss::NoCodeBlock(BlockMiss::NoReadmeMarker))
        );
    }

    #[test]
    fn test_readme_marker_without_results() {
        let text = "[end of readme]\njust prose\nmore prose\n</code>";
        assert_eq!(extract(text), Err(ExtractionMiss::NoRetrievalResults));
    }

    #[test]
    fn test_readme_marker_broken_by_newline() {
        let text = "[end of readme\n]\n[start of a.py]\nx\n</code>";
        assert_eq!(
            extract(text),
            Err(ExtractionMiss::NoCodeBlock(BlockMiss::MalformedReadmeMarker))
        );
    }

    #[test]
    fn test_readme_marker_not_followed_by_newline() {
        let text = "[end of readme] trailing\n[start of a.py]\nx\n</code>";
        assert_eq!(
            extract(text),
            Err(ExtractionMiss::NoCodeBlock(BlockMiss::MalformedReadmeMarker))
        );
    }

    #[test]
    fn test_unclosed_block() {
        let text = "[end of readme]\n[start of a.py]\nx\n";
        assert_eq!(
            extract(text),
            Err(ExtractionMiss::NoCodeBlock(BlockMiss::UnclosedBlock))
        );
    }

    #[test]
    fn test_malformed_candidate_is_skipped_for_a_later_one() {
        let text = "see [end of readme without close\n[end of readme.md]\n[start of ok.py]\nx\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["ok.py"]);
    }

    #[test]
    fn test_only_first_block_is_scanned() {
        let text = "[end of readme]\n[start of first.py]\nx\n</code>\n\
                    [end of readme]\n[start of second.py]\ny\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["first.py"]);
    }

    #[test]
    fn test_block_stops_at_first_close() {
        let text = "[end of readme]\nx\n</code>\n[start of late.py]\ny\n</code>";
        assert_eq!(extract(text), Err(ExtractionMiss::NoRetrievalResults));
    }

    #[test]
    fn test_marker_on_last_block_line_is_ignored() {
        // The final block line is not newline-terminated inside the block.
        let text = "[end of readme]\n[start of a.py]\nx\n[start of b.py]\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["a.py"]);
    }

    #[test]
    fn test_inline_marker_is_not_a_result() {
        let text = "[end of readme]\nsee [start of a.py] here\nx\n</code>";
        assert_eq!(extract(text), Err(ExtractionMiss::NoRetrievalResults));
    }

    #[test]
    fn test_brackets_inside_path_are_kept() {
        let text = "[end of readme]\n[start of tests/[id]/page.py]\nx\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["tests/[id]/page.py"]);
    }

    #[test]
    fn test_empty_path_is_kept() {
        let text = "[end of readme]\n[start of ]\nx\n[start of a.py]\ny\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["", "a.py"]);
    }

    #[test]
    fn test_out_of_tree_paths_are_not_rejected() {
        let text = "[end of readme]\n[start of ../../etc/passwd]\nx\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["../../etc/passwd"]);
    }

    #[test]
    fn test_find_block_returns_body_without_closing_newline() {
        let extractor = RetrievalBlockExtractor::new();
        let block = extractor
            .find_block("[end of readme (rst)]\nline one\nline two\n</code>")
            .unwrap();
        assert_eq!(block, "line one\nline two");
    }

    #[test]
    fn test_non_ascii_text_is_handled() {
        let text = "Ünïcödé [end of readme]\n[start of docs/é.md]\n—\n</code>";
        assert_eq!(extract(text).unwrap(), vec!["docs/é.md"]);
    }
}

//! Inline citation markers.
//!
//! Providers report supported spans as UTF-8 byte offsets into the answer,
//! so markers are spliced on byte positions, never on character positions.

use std::cmp::Reverse;

use crate::types::GroundingSupport;

/// A marker to splice into the answer at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationInsertion {
    /// Byte offset into the original text.
    pub index: usize,
    /// Marker text, e.g. `[1][2]`.
    pub marker: String,
}

impl CitationInsertion {
    pub fn new(index: usize, marker: impl Into<String>) -> Self {
        Self {
            index,
            marker: marker.into(),
        }
    }
}

/// Splice every marker into `text` at its byte offset.
///
/// Offsets always refer to the original text. Insertions are applied from
/// the highest offset down so earlier splices never shift later ones. An
/// offset past the end (or past an already-processed offset) is clamped.
/// Markers sharing an offset appear in the order they were given.
pub fn insert_citations(text: &str, insertions: &[CitationInsertion]) -> String {
    if insertions.is_empty() {
        return text.to_string();
    }

    let bytes = text.as_bytes();

    // Descending offset; among equal offsets, later insertions first, so that
    // prepending leaves the earlier ones leftmost.
    let mut order: Vec<(usize, &CitationInsertion)> = insertions.iter().enumerate().collect();
    order.sort_by_key(|(position, insertion)| (Reverse(insertion.index), Reverse(*position)));

    let mut pieces: Vec<&[u8]> = Vec::with_capacity(order.len() * 2 + 1);
    let mut cursor = bytes.len();

    for (_, insertion) in order {
        let index = insertion.index.min(cursor);
        pieces.push(&bytes[index..cursor]);
        pieces.push(insertion.marker.as_bytes());
        cursor = index;
    }
    pieces.push(&bytes[..cursor]);

    let total: usize = pieces.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for piece in pieces.iter().rev() {
        out.extend_from_slice(piece);
    }

    match String::from_utf8(out) {
        Ok(s) => s,
        // An offset inside a multi-byte character splits it; decode lossily.
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Render a set of 0-based chunk indices as `[n]` markers.
///
/// Indices are deduplicated and sorted; numbers are 1-based.
pub fn citation_marker(chunk_indices: &[usize]) -> String {
    let mut indices = chunk_indices.to_vec();
    indices.sort_unstable();
    indices.dedup();
    indices.iter().map(|i| format!("[{}]", i + 1)).collect()
}

/// Map grounding supports to insertions.
///
/// Supports without a segment, without an end offset, or with no chunk
/// indices are skipped.
pub fn support_insertions(supports: &[GroundingSupport]) -> Vec<CitationInsertion> {
    supports
        .iter()
        .filter_map(|support| {
            let end = support.segment.as_ref()?.end_index?;
            if support.grounding_chunk_indices.is_empty() {
                return None;
            }
            Some(CitationInsertion::new(
                end,
                citation_marker(&support.grounding_chunk_indices),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    #[test]
    fn test_no_insertions() {
        assert_eq!(insert_citations("unchanged", &[]), "unchanged");
    }

    #[test]
    fn test_insert_at_offsets() {
        let text = "Hello world, goodbye.";
        let insertions = vec![
            CitationInsertion::new(5, "[1]"),
            CitationInsertion::new(11, "[2]"),
        ];
        assert_eq!(
            insert_citations(text, &insertions),
            "Hello[1] world[2], goodbye."
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let text = "abcdefghij";
        let forward = vec![
            CitationInsertion::new(2, "<a>"),
            CitationInsertion::new(5, "<b>"),
            CitationInsertion::new(9, "<c>"),
        ];
        let mut shuffled = forward.clone();
        shuffled.swap(0, 2);

        let expected = "ab<a>cde<b>fghi<c>j";
        assert_eq!(insert_citations(text, &forward), expected);
        assert_eq!(insert_citations(text, &shuffled), expected);
    }

    #[test]
    fn test_output_length_is_sum_of_parts() {
        let text = "Grounded answer ✓ with ünïcödé";
        let insertions = vec![
            CitationInsertion::new(0, "[1]"),
            CitationInsertion::new(8, "[2][3]"),
            CitationInsertion::new(text.len(), "[4]"),
        ];
        let out = insert_citations(text, &insertions);
        let markers: usize = insertions.iter().map(|i| i.marker.len()).sum();
        assert_eq!(out.len(), text.len() + markers);
        assert!(out.starts_with("[1]Grounded[2][3]"));
        assert!(out.ends_with("ünïcödé[4]"));
    }

    #[test]
    fn test_multibyte_offsets_are_bytes() {
        // Each kana is 3 bytes; '!' ends at byte 16.
        let text = "こんにちは!";
        assert_eq!(text.len(), 16);
        let out = insert_citations(text, &[CitationInsertion::new(16, "[1]")]);
        assert_eq!(out, "こんにちは![1]");

        let out = insert_citations(text, &[CitationInsertion::new(6, "[2]")]);
        assert_eq!(out, "こん[2]にちは!");
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let out = insert_citations("short", &[CitationInsertion::new(100, "[1]")]);
        assert_eq!(out, "short[1]");
    }

    #[test]
    fn test_same_offset_keeps_given_order() {
        let insertions = vec![
            CitationInsertion::new(3, "[1]"),
            CitationInsertion::new(3, "[2]"),
            CitationInsertion::new(1, "[3]"),
        ];
        assert_eq!(insert_citations("abcd", &insertions), "a[3]bc[1][2]d");
    }

    #[test]
    fn test_citation_marker_dedupes_and_sorts() {
        assert_eq!(citation_marker(&[2, 0, 2, 1]), "[1][2][3]");
        assert_eq!(citation_marker(&[0]), "[1]");
    }

    #[test]
    fn test_support_insertions_skips_incomplete() {
        let supports = vec![
            GroundingSupport::new(5, [0]),
            GroundingSupport::new(9, [1, 0]),
            GroundingSupport {
                segment: None,
                grounding_chunk_indices: vec![0],
            },
            GroundingSupport {
                segment: Some(Segment {
                    start_index: Some(0),
                    end_index: None,
                    text: None,
                }),
                grounding_chunk_indices: vec![0],
            },
            GroundingSupport::new(3, Vec::new()),
        ];

        assert_eq!(
            support_insertions(&supports),
            vec![
                CitationInsertion::new(5, "[1]"),
                CitationInsertion::new(9, "[1][2]"),
            ]
        );
    }

    #[test]
    fn test_supports_end_to_end() {
        let text = "Rust is fast and safe.";
        let supports = vec![GroundingSupport::new(5, [0]), GroundingSupport::new(9, [0, 1])];
        let out = insert_citations(text, &support_insertions(&supports));
        assert_eq!(out, "Rust [1]is f[1][2]ast and safe.");
    }
}

//! Normalization of provider responses into a [`WebSearchResult`].
//!
//! Pure functions only; no I/O happens here.

use websearch_types::{Source, WebSearchResult};

use crate::citation::{insert_citations, support_insertions};
use crate::types::{GenerateContentResponse, GroundingSupport};

/// A provider answer reduced to text plus grounding evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundedAnswer {
    /// Answer text, with reasoning fragments already removed.
    pub text: String,
    /// Citable sources in provider order.
    pub sources: Vec<Source>,
    /// Supported spans, in UTF-8 byte offsets into `text`.
    pub supports: Vec<GroundingSupport>,
}

impl GroundedAnswer {
    /// Extract the answer from the first candidate of a Gemini response.
    pub fn from_gemini(response: &GenerateContentResponse) -> Self {
        let Some(candidate) = response.first_candidate() else {
            return Self::default();
        };

        let (sources, supports) = candidate
            .grounding_metadata
            .as_ref()
            .map(|m| (m.grounding_chunks.clone(), m.grounding_supports.clone()))
            .unwrap_or_default();

        Self {
            text: candidate.answer_text(),
            sources,
            supports,
        }
    }
}

/// Format a Gemini response for `query`.
pub fn format_response(response: &GenerateContentResponse, query: &str) -> WebSearchResult {
    format_answer(&GroundedAnswer::from_gemini(response), query)
}

/// Format a grounded answer for `query`.
///
/// An empty answer is a successful "nothing found" result. Otherwise markers
/// are spliced into the text and a numbered source list is appended.
pub fn format_answer(answer: &GroundedAnswer, query: &str) -> WebSearchResult {
    if answer.text.trim().is_empty() {
        return WebSearchResult::success(
            format!(
                "No search results or information found for query: \"{}\"",
                query
            ),
            "No information found.",
        );
    }

    let mut text = answer.text.clone();

    if !answer.sources.is_empty() {
        let insertions = support_insertions(&answer.supports);
        if !insertions.is_empty() {
            text = insert_citations(&text, &insertions);
        }

        let listing: Vec<String> = answer
            .sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                format!(
                    "[{}] {} ({})",
                    i + 1,
                    source.title().unwrap_or("Untitled"),
                    source.uri().unwrap_or("No URI")
                )
            })
            .collect();

        text.push_str("\n\nSources:\n");
        text.push_str(&listing.join("\n"));
    }

    WebSearchResult::success(
        format!("Web search results for \"{}\":\n\n{}", query, text),
        format!("Search results for \"{}\" returned.", query),
    )
    .with_sources(answer.sources.clone())
}

//! Renders retrieved products into the context block handed to the
//! generator. The prompt template depends on this layout (stable field
//! order, explicit confidence), so it is covered by tests.

use crate::catalog::ProductDocument;
use crate::rag::store::SearchResult;

/// Returned for an empty result set. Informational, never an error.
pub const NO_RESULTS_SENTINEL: &str = "No results found above the threshold.";

const DISPLAY_PREVIEW_LENGTH: usize = 200;

pub struct ContextFormatter {
    preview_length: usize,
}

impl ContextFormatter {
    pub fn new(preview_length: usize) -> Self {
        Self { preview_length }
    }

    /// Numbered sections, one per result in input order, with a bounded
    /// description preview. This is the literal generator context.
    pub fn format(&self, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return NO_RESULTS_SENTINEL.to_string();
        }

        let mut output = String::new();
        for (i, result) in results.iter().enumerate() {
            output.push_str(&format!(
                "Result {} (Confidence: {:.2})\n\n\
                 Product Name: {}\n\
                 Link: {}\n\
                 Price: {}\n\
                 Description: {}\n\n",
                i + 1,
                result.score,
                result.document.metadata.name,
                result.document.metadata.link,
                result.document.metadata.price,
                self.preview(&result.document.content),
            ));
        }

        output
    }

    #[allow(dead_code)]
    pub fn format_single(&self, document: &ProductDocument, score: Option<f32>) -> String {
        let mut output = format!(
            "Product Name: {}\nLink: {}\nPrice: {}\n",
            document.metadata.name, document.metadata.link, document.metadata.price
        );
        if let Some(score) = score {
            output.push_str(&format!("Confidence: {score:.2}\n"));
        }
        output.push_str(&format!("Description: {}", self.preview(&document.content)));
        output
    }

    /// Markdown rendering for display callers, not used in the prompt.
    pub fn format_for_display(&self, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return "No products found matching your query.".to_string();
        }

        let mut output = String::from("### Recommended Products\n\n");
        for (i, result) in results.iter().enumerate() {
            let preview: String = result
                .document
                .content
                .chars()
                .take(DISPLAY_PREVIEW_LENGTH)
                .collect();
            output.push_str(&format!(
                "**{}. {}** (Match: {:.0}%)\n\n\
                 - **Price:** {}\n\
                 - **Link:** [{}]({})\n\
                 - **Description:** {}...\n\n\
                 ---\n\n",
                i + 1,
                result.document.metadata.name,
                result.score * 100.0,
                result.document.metadata.price,
                result.document.metadata.link,
                result.document.metadata.link,
                preview,
            ));
        }

        output
    }

    // Char-based budget: descriptions are scraped text, not ASCII, and a
    // byte slice could split a codepoint.
    fn preview(&self, content: &str) -> String {
        content.chars().take(self.preview_length).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DocumentMetadata;

    fn result(name: &str, description: &str, score: f32) -> SearchResult {
        SearchResult {
            document: ProductDocument {
                content: description.to_string(),
                metadata: DocumentMetadata {
                    name: name.to_string(),
                    price: "$5".to_string(),
                    link: "http://x".to_string(),
                },
            },
            score,
        }
    }

    #[test]
    fn empty_results_return_the_sentinel() {
        let formatter = ContextFormatter::new(300);
        assert_eq!(formatter.format(&[]), NO_RESULTS_SENTINEL);
    }

    #[test]
    fn sections_are_numbered_with_two_decimal_confidence() {
        let formatter = ContextFormatter::new(300);
        let context = formatter.format(&[
            result("Pain Relief X", "for headaches", 0.8712),
            result("Vitamin C", "immune support", 0.65),
        ]);

        assert!(context.contains("Result 1 (Confidence: 0.87)"));
        assert!(context.contains("Result 2 (Confidence: 0.65)"));
        assert!(context.contains("Product Name: Pain Relief X"));
        assert!(context.contains("Link: http://x"));
        assert!(context.contains("Price: $5"));
        assert!(context.contains("Description: for headaches"));
    }

    #[test]
    fn description_is_bounded_by_the_char_budget() {
        let formatter = ContextFormatter::new(10);
        let context = formatter.format(&[result("A", "0123456789 overflow text", 0.9)]);

        assert!(context.contains("Description: 0123456789\n"));
        assert!(!context.contains("overflow"));
    }

    #[test]
    fn char_budget_does_not_split_multibyte_text() {
        let formatter = ContextFormatter::new(4);
        let context = formatter.format(&[result("A", "дозировка", 0.9)]);
        assert!(context.contains("Description: дози\n"));
    }

    #[test]
    fn single_result_includes_confidence_only_when_given() {
        let formatter = ContextFormatter::new(300);
        let doc = result("A", "desc", 0.5).document;

        let with_score = formatter.format_single(&doc, Some(0.5));
        assert!(with_score.contains("Confidence: 0.50"));

        let without_score = formatter.format_single(&doc, None);
        assert!(!without_score.contains("Confidence"));
    }

    #[test]
    fn display_rendering_handles_empty_results() {
        let formatter = ContextFormatter::new(300);
        assert_eq!(
            formatter.format_for_display(&[]),
            "No products found matching your query."
        );
    }
}

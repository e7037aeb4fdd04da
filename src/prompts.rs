//! Prompt templates. Centralized so wording changes stay reviewable in one
//! place.

/// Template for the recommendation call. `{input}` is the customer query,
/// `{context}` the formatted retrieval block from
/// [`crate::rag::ContextFormatter::format`].
pub const RECOMMENDATION_PROMPT: &str = "\
You are a helpful medical advisor assistant.
A customer has described their condition or symptoms.
You must choose the most relevant products from the retrieved list below and if there is no relevants say no products available, display the product price and its link.

Customer Query: {input}

Retrieved Products:
{context}

Instructions:
- Recommend the most relevant product.
- Explain briefly why the product matches the query.
- If no suitable product is found, clearly say \"No relevant product found.\"
- Keep the answer short and professional.
- Provide the product name, price, and link from provided context metadata.
";

pub fn render_recommendation_prompt(query: &str, context: &str) -> String {
    RECOMMENDATION_PROMPT
        .replace("{input}", query)
        .replace("{context}", context)
}

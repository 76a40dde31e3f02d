//! Prompt construction for chat-based normalization

use crate::model::RawRecord;

/// System message sent with every normalization request
pub const SYSTEM_PROMPT: &str = "You are a precise data extraction specialist. \
Extract data accurately from HTML and return only valid JSON without any markdown \
formatting or explanations. Never wrap your response in code blocks.";

const INSTRUCTIONS: &str = r#"You are a data extraction model that transforms messy e-commerce HTML into organized, developer-friendly JSON.

Extract these top-level fields:
- title
- primaryPrice
- approxPrice
- description

Description guidelines:
- Combine all meaningful data from every <section> that is not a title or price (specifications, attributes, payment, shipping, notes).
- Organize structured data such as "Color: White" as key-value pairs inside the "description" object.
- Keep narrative text as readable string values under appropriately inferred keys.
- Preserve hierarchy only when it adds clarity, otherwise flatten.
- If any top-level field is missing or empty, return "-" as its value.
- The result must be valid JSON with no comments or explanations.

Expected output format:
{
    "title": "",
    "primaryPrice": "",
    "approxPrice": "",
    "description": {}
}"#;

/// Wraps every raw field of `record` in a labelled section
///
/// Fields appear in name order, one `<section id="name">` block each.
pub fn build_sections(record: &RawRecord) -> String {
    record
        .fields
        .iter()
        .map(|(name, content)| format!("<section id=\"{}\">\n{}\n</section>", name, content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the user message for `record`
pub fn build_prompt(record: &RawRecord) -> String {
    format!(
        "{}\n\nHTML content:\n\"\"\"\n{}\n\"\"\"",
        INSTRUCTIONS,
        build_sections(record)
    )
}

/// Removes a surrounding markdown code fence, if the model added one anyway
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

//! Prompt templates for answer generation.

/// The literal phrase the model must emit when the retrieved context does
/// not contain the answer. Downstream consumers match on this string.
pub const FALLBACK_PHRASE: &str = "Information not found in protocol.";

/// Collection of prompt templates.
pub struct Prompts;

impl Prompts {
    /// System instruction for answer generation: grounded answers only,
    /// with the literal fallback phrase when the context is insufficient.
    pub fn answer_system() -> &'static str {
        "You are a clinical assistant. Use ONLY the context provided to answer. \
         If the answer is not in context, say 'Information not found in protocol.' \
         Example: Q: When is metformin stopped? A: Permanently discontinued if eGFR < 30 mL/min/1.73 m2."
    }

    /// User-turn template for answer generation.
    pub fn answer_user(context: &str, question: &str) -> String {
        format!("Context: {}\n\nQuestion: {}", context, question)
    }
}

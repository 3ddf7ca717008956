//! Prompt templates.

/// Answer returned without calling the model when retrieval finds nothing.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str = "I don't have enough information to answer that question. \
No relevant documents were found in the document store; upload a document that covers this topic and ask again.";

/// Grounded question prompt over retrieved chunk texts.
pub fn rag_prompt<S: AsRef<str>>(context: &[S], question: &str) -> String {
    let context = context
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on the following context, answer the user's question. \
If the context doesn't contain enough information to answer the question, say so.\n\n\
Context:\n{context}\n\n\
Question: {question}\n\n\
Answer:"
    )
}

/// Prompt asking a second model call to judge a response.
pub fn validation_prompt(request: &str, response: &str) -> String {
    format!(
        "You are a validator. Your job is to check if the response correctly answers the user's request.\n\n\
User Request: {request}\n\n\
Agent Response: {response}\n\n\
Analyze if the response:\n\
1. Directly addresses the user's question\n\
2. Is accurate and complete\n\
3. Is relevant to the request\n\n\
Respond with ONLY one of these:\n\
- \"VALID\" if the response is good\n\
- \"INVALID: [reason]\" if the response needs improvement\n\n\
Your validation:"
    )
}

/// Prompt for the next attempt after a rejected response.
pub fn retry_prompt(prompt: &str, feedback: &str) -> String {
    format!(
        "{prompt}\n\nPrevious attempt was insufficient. Validator feedback: {feedback}. Please provide a better response."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_prompt_layout() {
        let prompt = rag_prompt(&["first chunk", "second chunk"], "What is it?");
        assert!(prompt.starts_with("Based on the following context, answer the user's question. If the context"));
        assert!(prompt.contains("Context:\nfirst chunk\n\nsecond chunk\n\nQuestion: What is it?\n\nAnswer:"));
    }

    #[test]
    fn test_validation_prompt_embeds_both_sides() {
        let prompt = validation_prompt("What is 2+2?", "4");
        assert!(prompt.contains("User Request: What is 2+2?"));
        assert!(prompt.contains("Agent Response: 4"));
        assert!(prompt.ends_with("Your validation:"));
    }

    #[test]
    fn test_retry_prompt() {
        assert_eq!(
            retry_prompt("Q", "INVALID: too short"),
            "Q\n\nPrevious attempt was insufficient. Validator feedback: INVALID: too short. Please provide a better response."
        );
    }
}

/// Name the assistant introduces itself with.
pub const BOT_NAME: &str = "Doplhy";

/// Sentence the model must use when the knowledge base has no answer.
pub const REFUSAL: &str =
    "I don't know the answer to that from the story you gave me. Try asking something else!";

/// Marker line placed before and after the knowledge text.
pub const DELIMITER: &str = "---";

/// Build the system instruction with the full knowledge text embedded between delimiters.
pub fn build_system_instruction(knowledge: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a helpful and friendly chatbot for kids. Your name is {}.\n",
        BOT_NAME
    ));
    prompt.push_str("Your task is to answer questions based ONLY on the provided \"Knowledge Base\".\n");
    prompt.push_str("Do not use any external knowledge or your own information.\n");
    prompt.push_str(&format!(
        "If the answer to a question cannot be found in the \"Knowledge Base\", you MUST respond with \"{}\".\n",
        REFUSAL
    ));
    prompt.push_str("Keep your answers simple, short, and friendly for a child.\n\n");

    prompt.push_str("Here is the Knowledge Base:\n");
    prompt.push_str(DELIMITER);
    prompt.push('\n');
    prompt.push_str(knowledge);
    prompt.push('\n');
    prompt.push_str(DELIMITER);
    prompt.push('\n');

    prompt
}

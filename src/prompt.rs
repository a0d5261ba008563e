/// Build the instruction sent to the model for one user question.
///
/// The question is embedded verbatim. The model is asked to answer as a
/// smart grid expert and to reply with a JSON object holding `explanation`
/// and, when the topic has numbers worth plotting, `data` and `labels`.
pub fn build_prompt(user_text: &str) -> String {
    format!(
        r#"You are a smart grid expert assistant. Please provide information about: {user_text}
If the question is related to data or metrics, include some sample numerical data that could be visualized.
Format your response as a JSON object with these keys:
- explanation: Your main response, as a string
- data: If applicable, provide relevant numerical data as a list of numbers
- labels: If providing data, include labels as a list of strings, one per number
Respond with the JSON object only."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_question_verbatim() {
        let question = "What is {peak} \"load\" balancing?\nTell me.";
        let prompt = build_prompt(question);
        assert!(prompt.contains(question));
    }

    #[test]
    fn test_prompt_names_schema_keys() {
        let prompt = build_prompt("Explain smart meters");
        assert!(prompt.contains("smart grid expert"));
        assert!(prompt.contains("explanation"));
        assert!(prompt.contains("data"));
        assert!(prompt.contains("labels"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("demand response"), build_prompt("demand response"));
    }
}

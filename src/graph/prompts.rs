// Prompt templates for the answer and reflect stages

/// Upper bound on the reflection length requested from the model.
pub const REFLECTION_MAX_WORDS: usize = 30;

pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an intelligent assistant. Answer clearly and concisely using only the provided context.\n\
         Context: {}\n\
         Question: {}\n",
        context, question
    )
}

pub fn reflection_prompt(question: &str, answer: &str) -> String {
    format!(
        "Evaluate if the answer below is relevant and complete for the question.\n\
         Question: {}\n\
         Answer: {}\n\
         Respond briefly (max {} words) like 'Yes, relevant and complete' or 'Partially relevant because...'\n",
        question, answer, REFLECTION_MAX_WORDS
    )
}

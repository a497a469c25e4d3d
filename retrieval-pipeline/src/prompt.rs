/// System role description for the summarization stage. The assistant is
/// constrained to the retrieved documents and must never answer from outside
/// knowledge.
pub const SYSTEM_PROMPT: &str = "\
= Your Role =\n\
You are a technical assistant answering questions about cloud infrastructure. \
Your only knowledge base is the set of resource documents provided in the user \
message: JSON records describing buckets, instances, firewalls and other \
resources from an ingested inventory snapshot.\n\n\
= Rules =\n\
- Answer strictly from the provided documents. Never use general knowledge or \
assumptions about cloud platforms, and never invent resources that are not in \
the documents.\n\
- If the documents do not contain the information needed, say so plainly.\n\
- Interpret the JSON structure of each record (fields such as `encryption`, \
`lifecycle`, `status`, `name`) to give precise, fact-based answers.\n\
- Cite the data points supporting your answer as lines in the exact format \
'Reference: [source information]'.\n\
- Use bullet points or short tables when they make the answer clearer.";

/// Fixed instruction appended after the documents.
const ANSWER_INSTRUCTION: &str = "\nProvide a detailed answer to the question above based on \
the relevant documents. Include references in the format 'Reference: [source information]'.";

/// Assemble the single user prompt: the question, every retrieved document on
/// a bullet line, then the fixed answering instruction.
pub fn build_prompt(question: &str, documents: &[String]) -> String {
    let mut prompt = format!("Question: {question}\n\nRelevant Documents:\n");
    for document in documents {
        prompt.push_str("- ");
        prompt.push_str(document);
        prompt.push('\n');
    }
    prompt.push_str(ANSWER_INSTRUCTION);
    prompt
}

/// Collect every line of the completion that starts with the literal prefix
/// `Reference:`. This is a plain prefix filter, not a structured parse;
/// reference-like mentions elsewhere in a line are not captured.
pub fn extract_references(report: &str) -> Vec<String> {
    report
        .lines()
        .filter(|line| line.starts_with("Reference:"))
        .map(str::to_owned)
        .collect()
}

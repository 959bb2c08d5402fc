//! Prompts for retrieval question answering.

/// Collection of prompts used by the QA chains.
pub struct Prompts;

impl Prompts {
    /// Answer a question from all retrieved passages at once.
    ///
    /// Placeholders: `{context}`, `{question}`.
    pub fn stuff_qa() -> &'static str {
        r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"#
    }

    /// First step of the refine chain, answering from one passage.
    ///
    /// Placeholders: `{context}`, `{question}`.
    pub fn refine_initial() -> &'static str {
        r#"Context information is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the question: {question}
"#
    }

    /// Later steps of the refine chain, improving an existing answer.
    ///
    /// Placeholders: `{question}`, `{existing_answer}`, `{context}`.
    pub fn refine_step() -> &'static str {
        r#"The original question is as follows: {question}
We have provided an existing answer: {existing_answer}
We have the opportunity to refine the existing answer (only if needed) with some more context below.
------------
{context}
------------
Given the new context, refine the original answer to better answer the question. If the context isn't useful, return the original answer."#
    }

    /// Fill `{name}` placeholders in one pass over the template.
    ///
    /// Substituted text is copied as-is; unknown placeholders are left alone.
    pub fn render(template: &str, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let name = &after[..close];
                values
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| (*v, close))
            });
            match value {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

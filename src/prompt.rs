//! Grading prompt construction.
//!
//! [`build_prompt`] is pure: the same context, question, and answer always
//! produce the same bytes. The format block it asks the model to follow is
//! rendered from [`Field`], the same table the parser extracts with.

use crate::models::RetrievedDocument;
use crate::parser::Field;

/// Placed between retrieved documents in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Shown in place of the context block when retrieval found nothing.
pub const EMPTY_CONTEXT: &str = "(No reference material was found for this question.)";

pub fn build_prompt(context: &[RetrievedDocument], question: &str, student_answer: &str) -> String {
    let context_block = if context.is_empty() {
        EMPTY_CONTEXT.to_string()
    } else {
        context
            .iter()
            .map(|r| r.document.text.trim())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    };

    let format_block = Field::ALL
        .iter()
        .map(|field| format!("{}: {}", field.label(), field.placeholder()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an AI Exam Verifier. Evaluate the student's answer based only on the provided context.

**Textbook Context:**
{context_block}

**Exam Question:**
{question}

**Student's Answer:**
{student_answer}

**Instructions:**
Provide a detailed analysis in the following format. Do not add any other text or explanations.

{format_block}
",
        question = question.trim(),
        student_answer = student_answer.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn retrieved(id: &str, text: &str) -> RetrievedDocument {
        RetrievedDocument {
            document: Document {
                id: id.to_string(),
                source: format!("{}.txt", id),
                text: text.to_string(),
            },
            distance: 0.25,
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let context = vec![
            retrieved("doc_0", "Calculus is the study of change."),
            retrieved("doc_1", "A derivative measures instantaneous rate of change."),
        ];
        let a = build_prompt(&context, "What is calculus?", "It's about derivatives.");
        let b = build_prompt(&context, "What is calculus?", "It's about derivatives.");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_inputs_in_order() {
        let context = vec![
            retrieved("doc_0", "FIRST PASSAGE"),
            retrieved("doc_1", "SECOND PASSAGE"),
        ];
        let prompt = build_prompt(&context, "QUESTION TEXT", "ANSWER TEXT");

        let first = prompt.find("FIRST PASSAGE").unwrap();
        let second = prompt.find("SECOND PASSAGE").unwrap();
        let question = prompt.find("QUESTION TEXT").unwrap();
        let answer = prompt.find("ANSWER TEXT").unwrap();
        assert!(first < second && second < question && question < answer);
        assert!(prompt.contains(&format!("FIRST PASSAGE{}SECOND PASSAGE", CONTEXT_SEPARATOR)));
    }

    #[test]
    fn test_prompt_lists_every_field_label() {
        let prompt = build_prompt(&[], "q", "a");
        for field in Field::ALL {
            assert!(
                prompt.contains(&format!("\n{}: ", field.label())),
                "missing label {}",
                field.label()
            );
        }
    }

    #[test]
    fn test_empty_context_marker() {
        let prompt = build_prompt(&[], "What is calculus?", "It's about derivatives.");
        assert!(prompt.contains(EMPTY_CONTEXT));
    }
}

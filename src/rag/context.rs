use crate::types::{ConversationTurn, RetrievalCandidate};

/// How many trailing conversation turns survive into the prompt.
pub const HISTORY_WINDOW: usize = 5;

/// Assemble the grounded prompt from retrieved candidates and conversation
/// history.
///
/// Candidates are rendered in the order received (retrieval order, i.e.
/// descending score) and never re-sorted here. Only the last
/// [`HISTORY_WINDOW`] turns of history are kept. The template deliberately
/// permits answering outside the retrieved context when grounding is weak,
/// trading strict faithfulness for availability.
pub fn build_prompt(
    question: &str,
    candidates: &[RetrievalCandidate],
    history: &[ConversationTurn],
) -> String {
    let context = render_documents(candidates);
    let history_block = render_history(history);

    let history_section = if history_block.is_empty() {
        String::new()
    } else {
        format!("Conversation history:\n{history_block}\n\n")
    };

    format!(
        "\
You are an intelligent assistant specialized in AWS and cloud technologies.

{history_section}Context from available documents:
{context}

User question: {question}

Instructions:
1. If you find relevant information in the context, base your answer on it and cite the sources
2. If you do NOT find specific information in the context:
   - Acknowledge that you do not have that specific information in your documents
   - If the question is about cloud/AWS technology, provide a helpful general answer
   - Suggest related topics you can answer from your documents
3. Keep a professional and friendly tone
4. Be clear and concise in your answer
5. If the question is about AWS or related technologies, you may use general knowledge

Answer:
"
    )
}

fn render_documents(candidates: &[RetrievalCandidate]) -> String {
    let mut parts = Vec::with_capacity(candidates.len() * 3);
    for candidate in candidates {
        parts.push(format!("Document: {}", candidate.title));
        parts.push(format!("Content: {}", candidate.content));
        parts.push("---".to_string());
    }
    parts.join("\n")
}

fn render_history(history: &[ConversationTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.display_name(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn candidate(title: &str, content: &str, score: f64) -> RetrievalCandidate {
        RetrievalCandidate {
            id: format!("id-{title}"),
            title: title.to_string(),
            content: content.to_string(),
            metadata: json!({}),
            score,
        }
    }

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn candidates_render_in_received_order() {
        // Deliberately not sorted by score; the prompt must keep this order.
        let candidates = vec![
            candidate("Second", "lower-ranked body", 0.2),
            candidate("First", "higher-ranked body", 0.9),
        ];

        let prompt = build_prompt("what is S3?", &candidates, &[]);
        let second_pos = prompt.find("Document: Second").unwrap();
        let first_pos = prompt.find("Document: First").unwrap();
        assert!(second_pos < first_pos);
    }

    #[test]
    fn history_is_limited_to_last_five_turns() {
        let history: Vec<ConversationTurn> = (0..8)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                turn(role, &format!("turn {i}"))
            })
            .collect();

        let prompt = build_prompt("question", &[], &history);
        for i in 0..3 {
            assert!(!prompt.contains(&format!("turn {i}")), "turn {i} kept");
        }
        for i in 3..8 {
            assert!(prompt.contains(&format!("turn {i}")), "turn {i} dropped");
        }
    }

    #[test]
    fn empty_history_renders_no_header() {
        let prompt = build_prompt("question", &[], &[]);
        assert!(!prompt.contains("Conversation history:"));
        assert!(prompt.contains("User question: question"));
    }

    #[test]
    fn roles_are_capitalized() {
        let history = vec![
            turn(Role::User, "hello"),
            turn(Role::Assistant, "hi, how can I help?"),
        ];

        let prompt = build_prompt("question", &[], &history);
        assert!(prompt.contains("User: hello"));
        assert!(prompt.contains("Assistant: hi, how can I help?"));
    }
}

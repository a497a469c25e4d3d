use serde::Serialize;

/// One answered question, as rendered in the sidebar and the answer pane.
#[derive(Debug, Clone, Serialize)]
pub struct QnaExchange {
    pub question: String,
    pub answer: String,
    pub references: Vec<String>,
}

/// Append-only question/answer log for one interactive session.
///
/// Owned by the session handler as an explicit injected handle; entries are
/// addressed by insertion position and never persisted past the process.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Vec<QnaExchange>,
}

impl SessionHistory {
    /// Append an exchange and return its position for sidebar shortcuts.
    pub fn append(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        references: Vec<String>,
    ) -> usize {
        self.entries.push(QnaExchange {
            question: question.into(),
            answer: answer.into(),
            references,
        });
        self.entries.len() - 1
    }

    pub fn get(&self, position: usize) -> Option<&QnaExchange> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[QnaExchange] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

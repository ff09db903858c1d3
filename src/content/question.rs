/// Canonical in-memory question model. The remote representation never
/// appears here; everything crossing the wire goes through `codec`.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// local identifier, stable for the editing session
    pub id: u64,

    pub prompt: String,

    pub points: u32,

    /// 1-based position within the quiz
    pub order: usize,

    pub body: QuestionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionBody {
    Single { options: Vec<Choice> },
    Multiple { options: Vec<Choice> },
    Numerical { answer: String },
    Match { pairs: Vec<MatchPair> },
    Subjective { guidance: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Choice {
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Single,
    Multiple,
    Numerical,
    Match,
    Subjective,
}

impl Question {
    /// A blank question of the given kind, the shape the editor starts from.
    pub fn blank(id: u64, kind: QuestionKind, order: usize) -> Self {
        let body = match kind {
            QuestionKind::Single => QuestionBody::Single {
                options: vec![Choice::default(), Choice::default()],
            },
            QuestionKind::Multiple => QuestionBody::Multiple {
                options: vec![Choice::default(), Choice::default()],
            },
            QuestionKind::Numerical => QuestionBody::Numerical {
                answer: String::new(),
            },
            QuestionKind::Match => QuestionBody::Match {
                pairs: vec![MatchPair::default()],
            },
            QuestionKind::Subjective => QuestionBody::Subjective {
                guidance: String::new(),
            },
        };

        Self {
            id,
            prompt: String::new(),
            points: 1,
            order,
            body,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self.body {
            QuestionBody::Single { .. } => QuestionKind::Single,
            QuestionBody::Multiple { .. } => QuestionKind::Multiple,
            QuestionBody::Numerical { .. } => QuestionKind::Numerical,
            QuestionBody::Match { .. } => QuestionKind::Match,
            QuestionBody::Subjective { .. } => QuestionKind::Subjective,
        }
    }

    /// Options with non-empty text, the only ones that count for validation
    /// and the only ones encoded for the backend.
    pub fn filled_options(&self) -> Vec<&Choice> {
        match &self.body {
            QuestionBody::Single { options } | QuestionBody::Multiple { options } => options
                .iter()
                .filter(|o| !o.text.trim().is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

//! Tolerant mapper between the backend's question representation and the
//! canonical model. Field names and shapes vary between backend builds, so
//! every logical attribute is resolved from an ordered list of candidate
//! names and decoding degrades to defaults instead of erroring; whatever is
//! missing gets caught later by the validator.

use serde_json::{json, Map, Value};

use super::question::{Choice, MatchPair, Question, QuestionBody, QuestionKind};

const PROMPT_FIELDS: &[&str] = &["question", "prompt", "title", "text"];
const OPTION_LIST_FIELDS: &[&str] = &["options", "choices", "answers"];
const OPTION_TEXT_FIELDS: &[&str] = &["text", "label", "option"];
const OPTION_CORRECT_FIELDS: &[&str] = &["correct", "isCorrect", "is_correct"];
const CORRECT_INDEX_FIELDS: &[&str] = &["correctOption", "correctOptionIndex", "correct_option"];
const CORRECT_INDEXES_FIELDS: &[&str] =
    &["correctOptions", "correctOptionIndexes", "correct_options"];
const NUMERICAL_FIELDS: &[&str] = &["correctAnswer", "answer", "answerText"];
const PAIR_LIST_FIELDS: &[&str] = &["pairs", "matchPairs"];
const PAIR_LEFT_FIELDS: &[&str] = &["left", "key"];
const PAIR_RIGHT_FIELDS: &[&str] = &["right", "value"];
const GUIDANCE_FIELDS: &[&str] = &["guidance", "expectedAnswer", "answer"];

/// Decode a remote question object. Never fails: unknown kinds become
/// subjective, missing fields become empty defaults.
pub fn decode(remote: &Value, id: u64, fallback_order: usize) -> Question {
    let kind = first_text(remote, &["type", "questionType", "kind"])
        .map(|t| t.to_lowercase())
        .map_or(QuestionKind::Subjective, |t| match t.as_str() {
            "single" | "single_choice" => QuestionKind::Single,
            "multiple" | "multiple_choice" => QuestionKind::Multiple,
            "numerical" | "numeric" => QuestionKind::Numerical,
            "match" | "matching" => QuestionKind::Match,
            _ => QuestionKind::Subjective,
        });

    let body = match kind {
        QuestionKind::Single => QuestionBody::Single {
            options: decode_options(remote),
        },
        QuestionKind::Multiple => QuestionBody::Multiple {
            options: decode_options(remote),
        },
        QuestionKind::Numerical => QuestionBody::Numerical {
            answer: first_text(remote, NUMERICAL_FIELDS).unwrap_or_default(),
        },
        QuestionKind::Match => QuestionBody::Match {
            pairs: decode_pairs(remote),
        },
        QuestionKind::Subjective => QuestionBody::Subjective {
            guidance: first_text(remote, GUIDANCE_FIELDS).unwrap_or_default(),
        },
    };

    Question {
        id,
        prompt: first_text(remote, PROMPT_FIELDS).unwrap_or_default(),
        points: first_number(remote, &["points", "marks"]).unwrap_or(1) as u32,
        order: first_number(remote, &["order", "position"])
            .map(|n| n as usize)
            .unwrap_or(fallback_order),
        body,
    }
}

/// Encode a canonical question for the backend. Redundant synonymous keys
/// are emitted so that builds expecting either spelling are satisfied;
/// options with empty text are dropped here only, never from the model.
pub fn encode(question: &Question) -> Value {
    let mut out = Map::new();
    out.insert("question".into(), json!(question.prompt));
    out.insert("points".into(), json!(question.points));
    out.insert("order".into(), json!(question.order));

    match &question.body {
        QuestionBody::Single { options } => {
            out.insert("type".into(), json!("single"));
            let (texts, correct) = split_options(options);
            out.insert("options".into(), json!(texts));
            let index = correct.first().copied();
            out.insert("correctOption".into(), json!(index));
            out.insert("correctOptionIndex".into(), json!(index));
        }
        QuestionBody::Multiple { options } => {
            out.insert("type".into(), json!("multiple"));
            let (texts, correct) = split_options(options);
            out.insert("options".into(), json!(texts));
            out.insert("correctOptions".into(), json!(correct));
            out.insert("correctOptionIndexes".into(), json!(correct));
        }
        QuestionBody::Numerical { answer } => {
            out.insert("type".into(), json!("numerical"));
            out.insert("correctAnswer".into(), json!(answer));
            out.insert("answer".into(), json!(answer));
        }
        QuestionBody::Match { pairs } => {
            out.insert("type".into(), json!("match"));
            let kept: Vec<Value> = pairs
                .iter()
                .filter(|p| !p.left.trim().is_empty() || !p.right.trim().is_empty())
                .map(|p| json!({ "left": p.left, "right": p.right }))
                .collect();
            out.insert("pairs".into(), json!(kept));
            out.insert("matchPairs".into(), json!(kept));
        }
        QuestionBody::Subjective { guidance } => {
            out.insert("type".into(), json!("subjective"));
            out.insert("guidance".into(), json!(guidance));
        }
    }

    Value::Object(out)
}

/// Option lists arrive either as plain strings or as objects carrying a
/// text and a correct flag; an out-of-band index (or index list) overrides
/// the per-option flags, keyed by original array position.
fn decode_options(remote: &Value) -> Vec<Choice> {
    let raw = match first_array(remote, OPTION_LIST_FIELDS) {
        Some(raw) => raw,
        None => return Vec::new(),
    };

    let mut options: Vec<Choice> = raw
        .iter()
        .map(|item| match item {
            Value::String(s) => Choice {
                text: s.to_owned(),
                correct: false,
            },
            _ => Choice {
                text: first_text(item, OPTION_TEXT_FIELDS).unwrap_or_default(),
                correct: first_bool(item, OPTION_CORRECT_FIELDS).unwrap_or(false),
            },
        })
        .collect();

    if let Some(indexes) = correct_indexes(remote) {
        for option in options.iter_mut() {
            option.correct = false;
        }
        for index in indexes {
            if let Some(option) = options.get_mut(index) {
                option.correct = true;
            }
        }
    }

    options
}

fn correct_indexes(remote: &Value) -> Option<Vec<usize>> {
    if let Some(list) = first_array(remote, CORRECT_INDEXES_FIELDS) {
        return Some(list.iter().filter_map(as_index).collect());
    }
    for field in CORRECT_INDEX_FIELDS {
        if let Some(index) = remote.get(field).and_then(as_index) {
            return Some(vec![index]);
        }
    }
    None
}

fn decode_pairs(remote: &Value) -> Vec<MatchPair> {
    first_array(remote, PAIR_LIST_FIELDS)
        .map(|raw| {
            raw.iter()
                .map(|item| MatchPair {
                    left: first_text(item, PAIR_LEFT_FIELDS).unwrap_or_default(),
                    right: first_text(item, PAIR_RIGHT_FIELDS).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn split_options(options: &[Choice]) -> (Vec<&str>, Vec<usize>) {
    let filled: Vec<&Choice> = options.iter().filter(|o| !o.text.trim().is_empty()).collect();
    let texts = filled.iter().map(|o| o.text.as_str()).collect();
    let correct = filled
        .iter()
        .enumerate()
        .filter(|(_, o)| o.correct)
        .map(|(i, _)| i)
        .collect();
    (texts, correct)
}

// first populated string among candidate field names
fn first_text(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}

fn first_number(value: &Value, fields: &[&str]) -> Option<u64> {
    fields.iter().find_map(|field| value.get(field).and_then(as_index).map(|n| n as u64))
}

fn first_bool(value: &Value, fields: &[&str]) -> Option<bool> {
    fields.iter().find_map(|field| value.get(field).and_then(Value::as_bool))
}

fn first_array<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a Vec<Value>> {
    fields
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_array))
}

// indexes show up as numbers or as numeric strings depending on the build
fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correctness(question: &Question) -> Vec<bool> {
        match &question.body {
            QuestionBody::Single { options } | QuestionBody::Multiple { options } => {
                options.iter().map(|o| o.correct).collect()
            }
            _ => Vec::new(),
        }
    }

    #[test]
    fn flag_and_index_correctness_decode_identically() {
        let flagged = json!({
            "type": "single",
            "question": "Pick one",
            "options": [
                { "text": "a", "correct": false },
                { "text": "b", "correct": true },
            ],
        });
        let indexed = json!({
            "type": "single",
            "question": "Pick one",
            "options": ["a", "b"],
            "correctOptionIndex": 1,
        });

        assert_eq!(
            correctness(&decode(&flagged, 1, 1)),
            correctness(&decode(&indexed, 1, 1))
        );
    }

    #[test]
    fn index_list_overrides_per_option_flags() {
        let remote = json!({
            "type": "multiple",
            "question": "Pick some",
            "options": [
                { "text": "a", "isCorrect": true },
                { "text": "b", "isCorrect": false },
                { "text": "c", "isCorrect": false },
            ],
            "correctOptions": [1, 2],
        });

        assert_eq!(correctness(&decode(&remote, 1, 1)), vec![false, true, true]);
    }

    #[test]
    fn unrecognized_type_degrades_to_subjective() {
        let remote = json!({ "type": "essay", "prompt": "Discuss." });
        let question = decode(&remote, 1, 3);
        assert_eq!(question.kind(), QuestionKind::Subjective);
        assert_eq!(question.prompt, "Discuss.");
        assert_eq!(question.order, 3);

        // decoding never throws, even on an empty object
        let empty = decode(&json!({}), 2, 1);
        assert_eq!(empty.kind(), QuestionKind::Subjective);
        assert_eq!(empty.prompt, "");
        assert_eq!(empty.points, 1);
    }

    #[test]
    fn encode_then_decode_preserves_content_for_all_kinds() {
        let questions = vec![
            Question {
                id: 1,
                prompt: "Pick one".into(),
                points: 2,
                order: 1,
                body: QuestionBody::Single {
                    options: vec![
                        Choice { text: "a".into(), correct: false },
                        Choice { text: "b".into(), correct: true },
                    ],
                },
            },
            Question {
                id: 2,
                prompt: "Pick some".into(),
                points: 1,
                order: 2,
                body: QuestionBody::Multiple {
                    options: vec![
                        Choice { text: "x".into(), correct: true },
                        Choice { text: "y".into(), correct: false },
                        Choice { text: "z".into(), correct: true },
                    ],
                },
            },
            Question {
                id: 3,
                prompt: "2 + 2".into(),
                points: 1,
                order: 3,
                body: QuestionBody::Numerical { answer: "4".into() },
            },
            Question {
                id: 4,
                prompt: "Match them".into(),
                points: 1,
                order: 4,
                body: QuestionBody::Match {
                    pairs: vec![
                        MatchPair { left: "cat".into(), right: "meow".into() },
                        MatchPair { left: "dog".into(), right: "woof".into() },
                    ],
                },
            },
            Question {
                id: 5,
                prompt: "Explain".into(),
                points: 5,
                order: 5,
                body: QuestionBody::Subjective { guidance: "mention X".into() },
            },
        ];

        for question in questions {
            let decoded = decode(&encode(&question), question.id, question.order);
            assert_eq!(decoded, question, "kind {:?}", question.kind());
        }
    }

    #[test]
    fn empty_options_are_dropped_only_at_the_encode_boundary() {
        let question = Question {
            id: 1,
            prompt: "Pick one".into(),
            points: 1,
            order: 1,
            body: QuestionBody::Single {
                options: vec![
                    Choice { text: "a".into(), correct: false },
                    Choice { text: "".into(), correct: false },
                    Choice { text: "b".into(), correct: true },
                ],
            },
        };

        let encoded = encode(&question);
        assert_eq!(encoded["options"], json!(["a", "b"]));
        // index is relative to the emitted list, not the canonical one
        assert_eq!(encoded["correctOptionIndex"], json!(1));
    }

    #[test]
    fn half_filled_match_pairs_survive_encoding() {
        let question = Question {
            id: 1,
            prompt: "Match".into(),
            points: 1,
            order: 1,
            body: QuestionBody::Match {
                pairs: vec![
                    MatchPair { left: "only left".into(), right: "".into() },
                    MatchPair { left: "".into(), right: "".into() },
                ],
            },
        };

        let encoded = encode(&question);
        assert_eq!(encoded["pairs"].as_array().map(Vec::len), Some(1));
        assert_eq!(encoded["pairs"], encoded["matchPairs"]);
    }
}

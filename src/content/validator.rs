//! Pre-save completeness checks. Runs synchronously over the whole model
//! before the reconciler touches the network; the first violation blocks the
//! entire save. Pure: no mutation, no I/O.

use thiserror::Error;

use super::model::{ContentModel, Lesson, LessonBody};
use super::question::{Question, QuestionBody};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("lesson {lesson}: title is required")]
    MissingTitle { lesson: usize },

    #[error("lesson {lesson}: quiz title is required")]
    MissingQuizTitle { lesson: usize },

    #[error("lesson {lesson}: quiz duration must be greater than zero")]
    InvalidDuration { lesson: usize },

    #[error("lesson {lesson}, question {question}: prompt is required")]
    MissingPrompt { lesson: usize, question: usize },

    #[error("lesson {lesson}, question {question}: at least two options are required")]
    NotEnoughOptions { lesson: usize, question: usize },

    #[error("lesson {lesson}, question {question}: exactly one correct option is required")]
    WrongSingleCorrectCount { lesson: usize, question: usize },

    #[error("lesson {lesson}, question {question}: at least one correct option is required")]
    NoCorrectOption { lesson: usize, question: usize },

    #[error("lesson {lesson}, question {question}: an answer is required")]
    MissingAnswer { lesson: usize, question: usize },

    #[error("lesson {lesson}, question {question}: at least one complete pair is required")]
    NoCompletePair { lesson: usize, question: usize },
}

/// First violation, if any. This is what gates the reconciler.
pub fn validate(model: &ContentModel) -> Result<(), Violation> {
    match violations(model).into_iter().next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

/// Every violation in the model, addressed by lesson and question position.
pub fn violations(model: &ContentModel) -> Vec<Violation> {
    let mut found = Vec::new();
    for lesson in model.lessons() {
        check_lesson(lesson, &mut found);
    }
    found
}

fn check_lesson(lesson: &Lesson, found: &mut Vec<Violation>) {
    let at = lesson.order;
    match &lesson.body {
        LessonBody::Text(text) => {
            if text.title.trim().is_empty() {
                found.push(Violation::MissingTitle { lesson: at });
            }
        }
        LessonBody::Quiz(quiz) => {
            if quiz.title.trim().is_empty() {
                found.push(Violation::MissingQuizTitle { lesson: at });
            }
            if quiz.duration_minutes.unwrap_or(0) == 0 {
                found.push(Violation::InvalidDuration { lesson: at });
            }
            for question in &quiz.questions {
                check_question(at, question, found);
            }
        }
    }
}

fn check_question(lesson: usize, question: &Question, found: &mut Vec<Violation>) {
    let at = question.order;
    if question.prompt.trim().is_empty() {
        found.push(Violation::MissingPrompt { lesson, question: at });
    }

    match &question.body {
        QuestionBody::Single { .. } => {
            let filled = question.filled_options();
            if filled.len() < 2 {
                found.push(Violation::NotEnoughOptions { lesson, question: at });
            }
            if filled.iter().filter(|o| o.correct).count() != 1 {
                found.push(Violation::WrongSingleCorrectCount { lesson, question: at });
            }
        }
        QuestionBody::Multiple { .. } => {
            let filled = question.filled_options();
            if filled.len() < 2 {
                found.push(Violation::NotEnoughOptions { lesson, question: at });
            }
            if !filled.iter().any(|o| o.correct) {
                found.push(Violation::NoCorrectOption { lesson, question: at });
            }
        }
        QuestionBody::Numerical { answer } => {
            if answer.trim().is_empty() {
                found.push(Violation::MissingAnswer { lesson, question: at });
            }
        }
        QuestionBody::Match { pairs } => {
            let complete = pairs
                .iter()
                .any(|p| !p.left.trim().is_empty() && !p.right.trim().is_empty());
            if !complete {
                found.push(Violation::NoCompletePair { lesson, question: at });
            }
        }
        QuestionBody::Subjective { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::model::LessonKind;
    use crate::content::question::Choice;

    fn quiz_with_single(correct: &[usize], filled: usize) -> ContentModel {
        let mut model = ContentModel::new();
        let lesson = model.add_lesson(LessonKind::Quiz);
        {
            let quiz = model.lesson_mut(lesson).unwrap().as_quiz_mut().unwrap();
            quiz.title = "Quiz".into();
            quiz.duration_minutes = Some(10);
            let question = &mut quiz.questions[0];
            question.prompt = "Pick".into();
            if let QuestionBody::Single { options } = &mut question.body {
                options.clear();
                for i in 0..filled {
                    options.push(Choice {
                        text: format!("option {i}"),
                        correct: correct.contains(&i),
                    });
                }
            }
        }
        model
    }

    #[test]
    fn empty_text_title_is_rejected() {
        let mut model = ContentModel::new();
        model.add_lesson(LessonKind::Text);
        assert_eq!(
            validate(&model),
            Err(Violation::MissingTitle { lesson: 1 })
        );
    }

    #[test]
    fn zero_duration_quiz_is_rejected() {
        let mut model = ContentModel::new();
        let lesson = model.add_lesson(LessonKind::Quiz);
        {
            let quiz = model.lesson_mut(lesson).unwrap().as_quiz_mut().unwrap();
            quiz.title = "Quiz".into();
            quiz.duration_minutes = Some(0);
        }
        assert!(violations(&model).contains(&Violation::InvalidDuration { lesson: 1 }));
    }

    #[test]
    fn single_needs_exactly_one_correct_among_filled() {
        let none = quiz_with_single(&[], 2);
        assert!(violations(&none)
            .contains(&Violation::WrongSingleCorrectCount { lesson: 1, question: 1 }));

        let two = quiz_with_single(&[0, 1], 3);
        assert!(violations(&two)
            .contains(&Violation::WrongSingleCorrectCount { lesson: 1, question: 1 }));

        let one = quiz_with_single(&[0], 2);
        assert_eq!(validate(&one), Ok(()));
    }

    #[test]
    fn single_needs_two_filled_options() {
        let model = quiz_with_single(&[0], 1);
        assert!(violations(&model)
            .contains(&Violation::NotEnoughOptions { lesson: 1, question: 1 }));
    }

    #[test]
    fn match_needs_one_complete_pair() {
        let mut model = ContentModel::new();
        let lesson = model.add_lesson(LessonKind::Quiz);
        {
            let quiz = model.lesson_mut(lesson).unwrap().as_quiz_mut().unwrap();
            quiz.title = "Quiz".into();
            quiz.duration_minutes = Some(5);
            quiz.questions[0] = crate::content::question::Question {
                id: 99,
                prompt: "Match".into(),
                points: 1,
                order: 1,
                body: QuestionBody::Match {
                    pairs: vec![crate::content::question::MatchPair {
                        left: "only left".into(),
                        right: "".into(),
                    }],
                },
            };
        }
        assert_eq!(
            validate(&model),
            Err(Violation::NoCompletePair { lesson: 1, question: 1 })
        );
    }

    #[test]
    fn violations_are_collected_in_lesson_order() {
        let mut model = ContentModel::new();
        model.add_lesson(LessonKind::Text);
        model.add_lesson(LessonKind::Text);
        let found = violations(&model);
        assert_eq!(
            found,
            vec![
                Violation::MissingTitle { lesson: 1 },
                Violation::MissingTitle { lesson: 2 },
            ]
        );
    }
}

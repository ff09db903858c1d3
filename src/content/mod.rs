pub mod codec;
mod model;
mod question;
pub mod validator;

pub use model::{
    ContentModel, Lesson, LessonBody, LessonKind, QuizLesson, StagedFile, TextLesson,
};
pub use question::{Choice, MatchPair, Question, QuestionBody, QuestionKind};
pub use validator::{validate, violations, Violation};

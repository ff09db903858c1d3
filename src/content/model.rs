//! The client-held tree of lessons being edited. Everything here is keyed by
//! a locally generated `temp_id` so that reordering and deleting entries that
//! were never saved does not depend on server state; server ids are carried
//! alongside once the reconciler assigns them. No network calls originate in
//! this module.

use std::collections::HashSet;

use super::question::{Choice, MatchPair, Question, QuestionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonKind {
    Text,
    Quiz,
}

#[derive(Debug, Clone)]
pub struct Lesson {
    /// local identifier, stable for the editing session
    pub temp_id: u64,

    /// server chapter id, None until the first successful create
    pub chapter_id: Option<String>,

    /// server assessment id. Lives on the lesson rather than the quiz body
    /// so a quiz that is switched to a text lesson keeps the id around for
    /// orphan cleanup at the next save.
    pub assessment_id: Option<String>,

    /// 1-based position, contiguous across all lessons
    pub order: usize,

    pub body: LessonBody,
}

#[derive(Debug, Clone)]
pub enum LessonBody {
    Text(TextLesson),
    Quiz(QuizLesson),
}

#[derive(Debug, Clone, Default)]
pub struct TextLesson {
    pub title: String,
    pub body: String,
    pub attachments: Vec<String>,
    pub pending_file: Option<StagedFile>,
    pub attachments_to_remove: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuizLesson {
    pub title: String,
    /// empty field in the editor; must be Some(> 0) to save
    pub duration_minutes: Option<u32>,
    pub questions: Vec<Question>,
}

/// A file picked in the editor but not yet uploaded.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Lesson {
    pub fn kind(&self) -> LessonKind {
        match self.body {
            LessonBody::Text(_) => LessonKind::Text,
            LessonBody::Quiz(_) => LessonKind::Quiz,
        }
    }

    pub fn as_quiz_mut(&mut self) -> Option<&mut QuizLesson> {
        match &mut self.body {
            LessonBody::Quiz(quiz) => Some(quiz),
            LessonBody::Text(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextLesson> {
        match &mut self.body {
            LessonBody::Text(text) => Some(text),
            LessonBody::Quiz(_) => None,
        }
    }

    /// A display name for validation messages.
    pub fn title(&self) -> &str {
        match &self.body {
            LessonBody::Text(text) => &text.title,
            LessonBody::Quiz(quiz) => &quiz.title,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContentModel {
    lessons: Vec<Lesson>,
    /// chapter ids whose lesson was removed; consumed once at save time
    deleted_chapters: HashSet<String>,
    next_id: u64,
}

impl ContentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn lessons_mut(&mut self) -> &mut [Lesson] {
        &mut self.lessons
    }

    pub fn lesson(&self, temp_id: u64) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.temp_id == temp_id)
    }

    pub fn lesson_mut(&mut self, temp_id: u64) -> Option<&mut Lesson> {
        self.lessons.iter_mut().find(|l| l.temp_id == temp_id)
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Append a new empty lesson and return its temp id. A quiz always holds
    /// at least one question, so it starts with a blank one.
    pub fn add_lesson(&mut self, kind: LessonKind) -> u64 {
        let temp_id = self.alloc_id();
        let body = match kind {
            LessonKind::Text => LessonBody::Text(TextLesson::default()),
            LessonKind::Quiz => {
                let question_id = self.alloc_id();
                LessonBody::Quiz(QuizLesson {
                    questions: vec![Question::blank(question_id, QuestionKind::Single, 1)],
                    ..QuizLesson::default()
                })
            }
        };

        self.lessons.push(Lesson {
            temp_id,
            chapter_id: None,
            assessment_id: None,
            order: 0,
            body,
        });
        self.reindex();
        temp_id
    }

    /// Remove a lesson. If it was ever persisted, its chapter id moves into
    /// the deletion ledger for cascade removal at the next save.
    pub fn remove_lesson(&mut self, temp_id: u64) {
        let Some(position) = self.lessons.iter().position(|l| l.temp_id == temp_id) else {
            return;
        };
        let lesson = self.lessons.remove(position);
        if let Some(chapter_id) = lesson.chapter_id {
            self.deleted_chapters.insert(chapter_id);
        }
        self.reindex();
    }

    /// Hydration path: append an already-persisted lesson as loaded from the
    /// backend, assigning it a fresh temp id. Questions decoded with a
    /// placeholder id of 0 get a real local id here.
    pub fn push_loaded(
        &mut self,
        chapter_id: String,
        assessment_id: Option<String>,
        mut body: LessonBody,
    ) -> u64 {
        if let LessonBody::Quiz(quiz) = &mut body {
            for question in &mut quiz.questions {
                if question.id == 0 {
                    question.id = self.next_id + 1;
                    self.next_id += 1;
                }
            }
        }
        let temp_id = self.alloc_id();
        self.lessons.push(Lesson {
            temp_id,
            chapter_id: Some(chapter_id),
            assessment_id,
            order: 0,
            body,
        });
        self.reindex();
        temp_id
    }

    /// Switch a lesson between text and quiz, keeping its server ids. The
    /// reconciler deletes the orphaned assessment on a quiz-to-text switch.
    pub fn set_kind(&mut self, temp_id: u64, kind: LessonKind) {
        let next_question_id = self.next_id + 1;
        let Some(lesson) = self.lesson_mut(temp_id) else {
            return;
        };
        if lesson.kind() == kind {
            return;
        }
        lesson.body = match kind {
            LessonKind::Text => LessonBody::Text(TextLesson::default()),
            LessonKind::Quiz => LessonBody::Quiz(QuizLesson {
                questions: vec![Question::blank(next_question_id, QuestionKind::Single, 1)],
                ..QuizLesson::default()
            }),
        };
        if kind == LessonKind::Quiz {
            self.next_id = next_question_id;
        }
    }

    pub fn add_question(&mut self, lesson_temp_id: u64, kind: QuestionKind) -> Option<u64> {
        let question_id = self.alloc_id();
        let quiz = self.lesson_mut(lesson_temp_id)?.as_quiz_mut()?;
        let order = quiz.questions.len() + 1;
        quiz.questions.push(Question::blank(question_id, kind, order));
        Some(question_id)
    }

    /// No-op when the question is the last one left; a quiz always holds at
    /// least one question.
    pub fn remove_question(&mut self, lesson_temp_id: u64, question_id: u64) {
        let Some(quiz) = self
            .lesson_mut(lesson_temp_id)
            .and_then(Lesson::as_quiz_mut)
        else {
            return;
        };
        if quiz.questions.len() <= 1 {
            return;
        }
        quiz.questions.retain(|q| q.id != question_id);
        for (index, question) in quiz.questions.iter_mut().enumerate() {
            question.order = index + 1;
        }
    }

    pub fn question_mut(&mut self, lesson_temp_id: u64, question_id: u64) -> Option<&mut Question> {
        self.lesson_mut(lesson_temp_id)?
            .as_quiz_mut()?
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
    }

    pub fn add_option(&mut self, lesson_temp_id: u64, question_id: u64) {
        if let Some(options) = self.options_mut(lesson_temp_id, question_id) {
            options.push(Choice::default());
        }
    }

    pub fn remove_option(&mut self, lesson_temp_id: u64, question_id: u64, index: usize) {
        if let Some(options) = self.options_mut(lesson_temp_id, question_id) {
            if index < options.len() {
                options.remove(index);
            }
        }
    }

    pub fn set_option_text(
        &mut self,
        lesson_temp_id: u64,
        question_id: u64,
        index: usize,
        text: &str,
    ) {
        if let Some(option) = self
            .options_mut(lesson_temp_id, question_id)
            .and_then(|o| o.get_mut(index))
        {
            option.text = text.to_owned();
        }
    }

    /// Mark an option correct. Exclusive for single-choice questions,
    /// additive (toggle) for multiple-choice.
    pub fn mark_correct(&mut self, lesson_temp_id: u64, question_id: u64, index: usize) {
        use super::question::QuestionBody;

        let Some(question) = self.question_mut(lesson_temp_id, question_id) else {
            return;
        };
        match &mut question.body {
            QuestionBody::Single { options } => {
                for (i, option) in options.iter_mut().enumerate() {
                    option.correct = i == index;
                }
            }
            QuestionBody::Multiple { options } => {
                if let Some(option) = options.get_mut(index) {
                    option.correct = !option.correct;
                }
            }
            _ => {}
        }
    }

    pub fn add_pair(&mut self, lesson_temp_id: u64, question_id: u64) {
        if let Some(pairs) = self.pairs_mut(lesson_temp_id, question_id) {
            pairs.push(MatchPair::default());
        }
    }

    pub fn remove_pair(&mut self, lesson_temp_id: u64, question_id: u64, index: usize) {
        if let Some(pairs) = self.pairs_mut(lesson_temp_id, question_id) {
            if index < pairs.len() {
                pairs.remove(index);
            }
        }
    }

    pub fn set_pair(
        &mut self,
        lesson_temp_id: u64,
        question_id: u64,
        index: usize,
        left: &str,
        right: &str,
    ) {
        if let Some(pair) = self
            .pairs_mut(lesson_temp_id, question_id)
            .and_then(|p| p.get_mut(index))
        {
            pair.left = left.to_owned();
            pair.right = right.to_owned();
        }
    }

    /// Drain the deletion ledger. Called exactly once per save, before the
    /// upsert stage; the ledger is empty afterwards regardless of whether
    /// the individual deletions succeed.
    pub fn take_deleted_chapters(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.deleted_chapters.drain().collect();
        ids.sort();
        ids
    }

    pub fn pending_deletions(&self) -> usize {
        self.deleted_chapters.len()
    }

    fn options_mut(&mut self, lesson_temp_id: u64, question_id: u64) -> Option<&mut Vec<Choice>> {
        use super::question::QuestionBody;

        match &mut self.question_mut(lesson_temp_id, question_id)?.body {
            QuestionBody::Single { options } | QuestionBody::Multiple { options } => Some(options),
            _ => None,
        }
    }

    fn pairs_mut(&mut self, lesson_temp_id: u64, question_id: u64) -> Option<&mut Vec<MatchPair>> {
        use super::question::QuestionBody;

        match &mut self.question_mut(lesson_temp_id, question_id)?.body {
            QuestionBody::Match { pairs } => Some(pairs),
            _ => None,
        }
    }

    // order values across surviving lessons are always the contiguous range
    // 1..=N, recomputed after every membership change
    fn reindex(&mut self) {
        for (index, lesson) in self.lessons.iter_mut().enumerate() {
            lesson.order = index + 1;
        }
    }
}

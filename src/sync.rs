//! The reconciler: turns the in-memory content model into an ordered
//! sequence of persistence calls, and hydrates the model from the backend on
//! load. Stages run strictly sequentially; the assessment upsert for a
//! lesson depends on the chapter id that may have been assigned moments
//! earlier in the same pass.

use anyhow::Context;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{
    AssessmentUpsert, ChapterUpsert, CourseBackend, CourseUpdate, RequestError,
};
use crate::content::{
    codec, validate, ContentModel, Lesson, LessonBody, Question, QuestionKind, QuizLesson,
    TextLesson, Violation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Instructor,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Only admins may (re)assign the instructor during a save.
    pub fn can_assign_instructors(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseMeta {
    pub title: String,
    pub category: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub published: bool,
}

/// Everything one save needs, passed explicitly so the reconciler reads no
/// ambient session state.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub course_id: String,
    pub role: Role,
    pub meta: CourseMeta,
    /// base64 data url staged in the editor, uploaded before the course update
    pub staged_thumbnail: Option<String>,
    /// instructor to set as the sole assignee, privileged roles only
    pub instructor_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] Violation),

    #[error("saving course failed: {0}")]
    Api(#[from] RequestError),
}

/// Fetch the course and its chapters and hydrate the content model. A
/// failure here terminates the editing session.
pub fn load_course(
    backend: &dyn CourseBackend,
    course_id: &str,
) -> anyhow::Result<(CourseMeta, ContentModel)> {
    let course = backend
        .get_course(course_id)
        .context("failed to fetch course")?;
    let mut chapters = backend
        .list_chapters(course_id)
        .context("failed to fetch chapters")?;
    chapters.sort_by_key(|c| c.order);

    let mut model = ContentModel::new();
    for chapter in chapters {
        let assessment = backend
            .list_assessments(&chapter.id)
            .with_context(|| format!("failed to fetch assessments for chapter '{}'", chapter.id))?
            .into_iter()
            .next();

        match assessment {
            Some(record) => {
                // list responses may omit question detail
                let record = match record.questions {
                    Some(_) => record,
                    None => backend.get_assessment(&record.id).with_context(|| {
                        format!("failed to fetch assessment '{}'", record.id)
                    })?,
                };

                let mut questions: Vec<Question> = record
                    .questions
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .map(|(index, remote)| codec::decode(remote, 0, index + 1))
                    .collect();
                questions.sort_by_key(|q| q.order);
                if questions.is_empty() {
                    questions.push(Question::blank(0, QuestionKind::Single, 1));
                }

                // a zero or absent duration round-trips to an empty field
                let duration_minutes = record
                    .time_limit_seconds
                    .map(|seconds| (seconds / 60) as u32)
                    .filter(|minutes| *minutes > 0);

                model.push_loaded(
                    chapter.id,
                    Some(record.id),
                    LessonBody::Quiz(QuizLesson {
                        title: if record.title.is_empty() {
                            chapter.title
                        } else {
                            record.title
                        },
                        duration_minutes,
                        questions,
                    }),
                );
            }
            None => {
                model.push_loaded(
                    chapter.id,
                    None,
                    LessonBody::Text(TextLesson {
                        title: chapter.title,
                        body: chapter.content,
                        attachments: chapter.attachments,
                        ..TextLesson::default()
                    }),
                );
            }
        }
    }

    let meta = CourseMeta {
        title: course.title,
        category: course.category,
        description: course.description,
        thumbnail: course.thumbnail,
        published: course.published,
    };

    Ok((meta, model))
}

/// Run one save: validate, then drive the backend through the staged
/// pipeline. Server ids are written back into the model as they are
/// assigned, so a failed save retries from partially-persisted state rather
/// than from scratch.
pub fn save_course(
    backend: &dyn CourseBackend,
    request: &SaveRequest,
    model: &mut ContentModel,
) -> Result<(), SaveError> {
    // validation gates every network effect
    validate(model)?;

    // asset stage
    let thumbnail = match &request.staged_thumbnail {
        Some(data_url) => Some(backend.upload_thumbnail(data_url)?),
        None => request.meta.thumbnail.clone(),
    };

    // course stage
    backend.update_course(
        &request.course_id,
        &CourseUpdate {
            title: request.meta.title.clone(),
            thumbnail,
            category: request.meta.category.clone(),
            description: request.meta.description.clone(),
            status: if request.meta.published {
                "published".to_owned()
            } else {
                "draft".to_owned()
            },
        },
    )?;

    // assignment stage
    if request.role.can_assign_instructors() {
        if let Some(instructor_id) = &request.instructor_id {
            backend
                .set_course_instructors(&request.course_id, std::slice::from_ref(instructor_id))?;
        }
    }

    delete_removed_chapters(backend, model);

    // upsert stage, lessons in final order
    for lesson in model.lessons_mut() {
        upsert_lesson(backend, &request.course_id, lesson)?;
    }

    Ok(())
}

/// Cascade deletion of removed chapters. Best effort throughout: a failure
/// to list or delete is logged and never aborts the save, and the ledger is
/// consumed regardless.
fn delete_removed_chapters(backend: &dyn CourseBackend, model: &mut ContentModel) {
    for chapter_id in model.take_deleted_chapters() {
        match backend.list_assessments(&chapter_id) {
            Ok(assessments) => {
                for assessment in assessments {
                    if let Err(error) = backend.delete_assessment(&assessment.id) {
                        warn!(%chapter_id, assessment_id = %assessment.id, %error,
                            "failed to delete assessment of removed chapter");
                    }
                }
            }
            Err(error) => {
                warn!(%chapter_id, %error, "failed to list assessments of removed chapter");
            }
        }
        if let Err(error) = backend.delete_chapter(&chapter_id) {
            warn!(%chapter_id, %error, "failed to delete removed chapter");
        } else {
            debug!(%chapter_id, "deleted removed chapter");
        }
    }
}

fn upsert_lesson(
    backend: &dyn CourseBackend,
    course_id: &str,
    lesson: &mut Lesson,
) -> Result<(), SaveError> {
    let order = lesson.order;
    match &mut lesson.body {
        LessonBody::Text(text) => {
            // cleared only once the upload succeeds, so a failed save
            // retries with the staged file intact
            if let Some(file) = &text.pending_file {
                let url = backend.upload_file(file)?;
                text.attachments.push(url);
                text.pending_file = None;
            }
            if !text.attachments_to_remove.is_empty() {
                text.attachments
                    .retain(|url| !text.attachments_to_remove.contains(url));
                text.attachments_to_remove.clear();
            }

            let chapter = ChapterUpsert {
                title: text.title.clone(),
                content: Some(text.body.clone()),
                attachments: Some(text.attachments.clone()),
                order,
                is_published: true,
            };

            match lesson.chapter_id.clone() {
                Some(chapter_id) => {
                    backend.update_chapter(&chapter_id, &chapter)?;
                    // previously a quiz: its assessment is orphaned now
                    if let Some(assessment_id) = lesson.assessment_id.take() {
                        backend.delete_assessment(&assessment_id)?;
                    }
                }
                None => {
                    let chapter_id = backend.create_chapter(course_id, &chapter)?;
                    debug!(%chapter_id, order, "created chapter");
                    lesson.chapter_id = Some(chapter_id);
                }
            }
        }
        LessonBody::Quiz(quiz) => {
            let chapter = ChapterUpsert {
                title: quiz.title.clone(),
                content: None,
                attachments: None,
                order,
                is_published: true,
            };
            let questions: Vec<Value> = quiz.questions.iter().map(codec::encode).collect();
            let time_limit_seconds = u64::from(quiz.duration_minutes.unwrap_or(0)) * 60;
            let assessment = AssessmentUpsert::quiz(&quiz.title, time_limit_seconds, questions);

            let chapter_id = match lesson.chapter_id.clone() {
                Some(chapter_id) => {
                    backend.update_chapter(&chapter_id, &chapter)?;
                    chapter_id
                }
                None => {
                    let chapter_id = backend.create_chapter(course_id, &chapter)?;
                    debug!(%chapter_id, order, "created chapter");
                    lesson.chapter_id = Some(chapter_id.clone());
                    chapter_id
                }
            };

            match lesson.assessment_id.clone() {
                Some(assessment_id) => backend.update_assessment(&assessment_id, &assessment)?,
                None => {
                    let assessment_id = backend.create_assessment(&chapter_id, &assessment)?;
                    debug!(%assessment_id, %chapter_id, "created assessment");
                    lesson.assessment_id = Some(assessment_id);
                }
            }
        }
    }
    Ok(())
}

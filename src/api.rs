//! REST clients for the course backend. Response shapes are intentionally
//! permissive: every body goes through a single envelope unwrap and records
//! are read with ordered candidate field names, since spellings differ
//! between backend builds.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::content::StagedFile;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] Box<ureq::Error>),

    #[error("Failed to read response body: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Server returned an error: {status}")]
    ServerError { status: u16 },

    #[error("Unexpected response shape: {0}")]
    ShapeError(String),
}

impl From<ureq::Error> for RequestError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, _) => RequestError::ServerError { status: code },
            other => RequestError::HttpError(Box::new(other)),
        }
    }
}

/// Everything the reconciler and the load path need from the backend. The
/// production implementation is [`ApiClient`]; tests substitute a recording
/// fake.
pub trait CourseBackend {
    fn get_course(&self, course_id: &str) -> Result<CourseRecord, RequestError>;
    fn update_course(&self, course_id: &str, update: &CourseUpdate) -> Result<(), RequestError>;

    fn list_chapters(&self, course_id: &str) -> Result<Vec<ChapterRecord>, RequestError>;
    fn create_chapter(
        &self,
        course_id: &str,
        chapter: &ChapterUpsert,
    ) -> Result<String, RequestError>;
    fn update_chapter(&self, chapter_id: &str, chapter: &ChapterUpsert)
        -> Result<(), RequestError>;
    fn delete_chapter(&self, chapter_id: &str) -> Result<(), RequestError>;

    fn list_assessments(&self, chapter_id: &str) -> Result<Vec<AssessmentRecord>, RequestError>;
    fn get_assessment(&self, assessment_id: &str) -> Result<AssessmentRecord, RequestError>;
    fn create_assessment(
        &self,
        chapter_id: &str,
        assessment: &AssessmentUpsert,
    ) -> Result<String, RequestError>;
    fn update_assessment(
        &self,
        assessment_id: &str,
        assessment: &AssessmentUpsert,
    ) -> Result<(), RequestError>;
    fn delete_assessment(&self, assessment_id: &str) -> Result<(), RequestError>;

    fn upload_file(&self, file: &StagedFile) -> Result<String, RequestError>;
    fn upload_thumbnail(&self, data_url: &str) -> Result<String, RequestError>;

    fn list_instructors(&self) -> Result<Vec<Instructor>, RequestError>;
    fn set_course_instructors(
        &self,
        course_id: &str,
        instructor_ids: &[String],
    ) -> Result<(), RequestError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub title: String,
    pub thumbnail: Option<String>,
    pub category: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterUpsert {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    pub order: usize,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentUpsert {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub scope: String,
    pub time_limit_seconds: u64,
    pub max_attempts: u32,
    pub is_published: bool,
    pub order: u32,
    pub questions: Vec<Value>,
}

impl AssessmentUpsert {
    /// A chapter owns at most one assessment, so scope and order are fixed.
    pub fn quiz(title: &str, time_limit_seconds: u64, questions: Vec<Value>) -> Self {
        Self {
            title: title.to_owned(),
            kind: "quiz".to_owned(),
            scope: "chapter".to_owned(),
            time_limit_seconds,
            max_attempts: 1,
            is_published: true,
            order: 1,
            questions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub published: bool,
}

#[derive(Debug, Clone)]
pub struct ChapterRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub attachments: Vec<String>,
    pub order: usize,
}

#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub id: String,
    pub title: String,
    pub time_limit_seconds: Option<u64>,
    /// None when the list endpoint omits question detail; the load path then
    /// fetches the full record.
    pub questions: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct Instructor {
    pub id: String,
    pub name: String,
}

/// Unwrap any of the response envelopes the backend is known to produce:
/// `{data:{data}}`, `{data:{result}}`, `{data:{items}}` or `{data}`.
pub fn payload(mut body: Value) -> Value {
    for _ in 0..2 {
        let inner = match &mut body {
            Value::Object(map) => ["data", "result", "items"]
                .iter()
                .find_map(|key| map.remove(*key)),
            _ => None,
        };
        match inner {
            Some(inner) => body = inner,
            None => break,
        }
    }
    body
}

fn text_field(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        let v = value.get(field)?;
        match v {
            Value::String(s) if !s.is_empty() => Some(s.to_owned()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

fn number_field(value: &Value, fields: &[&str]) -> Option<u64> {
    fields.iter().find_map(|field| {
        let v = value.get(field)?;
        match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    })
}

fn id_field(value: &Value) -> Option<String> {
    text_field(value, &["id", "_id", "documentId"])
}

fn parse_course(value: &Value) -> Result<CourseRecord, RequestError> {
    let id = id_field(value).ok_or_else(|| RequestError::ShapeError("course has no id".into()))?;
    let published = match value.get("status") {
        Some(Value::String(s)) => s == "published",
        Some(Value::Bool(b)) => *b,
        _ => false,
    };
    Ok(CourseRecord {
        id,
        title: text_field(value, &["title", "name"]).unwrap_or_default(),
        category: text_field(value, &["category"]).unwrap_or_default(),
        description: text_field(value, &["description"]).unwrap_or_default(),
        thumbnail: text_field(value, &["thumbnail", "thumbnailUrl"]),
        published,
    })
}

fn parse_chapter(value: &Value, fallback_order: usize) -> Option<ChapterRecord> {
    let id = id_field(value)?;
    let attachments = value
        .get("attachments")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.to_owned()),
                    _ => text_field(item, &["url", "location"]),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(ChapterRecord {
        id,
        title: text_field(value, &["title", "name"]).unwrap_or_default(),
        content: text_field(value, &["content", "body"]).unwrap_or_default(),
        attachments,
        order: number_field(value, &["order", "position"])
            .map(|n| n as usize)
            .unwrap_or(fallback_order),
    })
}

fn parse_assessment(value: &Value) -> Option<AssessmentRecord> {
    let id = id_field(value)?;
    Some(AssessmentRecord {
        id,
        title: text_field(value, &["title", "name"]).unwrap_or_default(),
        time_limit_seconds: number_field(
            value,
            &["timeLimitSeconds", "timeLimit", "time_limit", "duration"],
        ),
        questions: value
            .get("questions")
            .and_then(Value::as_array)
            .map(|q| q.to_owned()),
    })
}

// RFC 3986 unreserved bytes pass through, everything else is escaped;
// filenames are user-chosen and routinely contain spaces or '&'
fn encode_query_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn url_field(value: &Value) -> Result<String, RequestError> {
    match value {
        Value::String(s) => Some(s.to_owned()),
        other => text_field(other, &["url", "location"]),
    }
    .ok_or_else(|| RequestError::ShapeError("upload response has no url".into()))
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let mut request = ureq::request(method, &format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }
        request
    }

    fn get_json(&self, path: &str) -> Result<Value, RequestError> {
        let response = self.request("GET", path).call()?;
        let body: Value = response.into_json()?;
        Ok(payload(body))
    }

    fn send_json(
        &self,
        method: &str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Value, RequestError> {
        let response = self.request(method, path).send_json(body)?;
        let body: Value = response.into_json()?;
        Ok(payload(body))
    }

    fn created_id(response: Value) -> Result<String, RequestError> {
        id_field(&response)
            .ok_or_else(|| RequestError::ShapeError("create response has no id".into()))
    }
}

impl CourseBackend for ApiClient {
    fn get_course(&self, course_id: &str) -> Result<CourseRecord, RequestError> {
        let body = self.get_json(&format!("/courses/{}", course_id))?;
        parse_course(&body)
    }

    fn update_course(&self, course_id: &str, update: &CourseUpdate) -> Result<(), RequestError> {
        self.send_json("PUT", &format!("/courses/{}", course_id), update)?;
        Ok(())
    }

    fn list_chapters(&self, course_id: &str) -> Result<Vec<ChapterRecord>, RequestError> {
        let body = self.get_json(&format!("/courses/{}/chapters", course_id))?;
        let items = body
            .as_array()
            .ok_or_else(|| RequestError::ShapeError("chapter list is not an array".into()))?;
        Ok(items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| parse_chapter(item, index + 1))
            .collect())
    }

    fn create_chapter(
        &self,
        course_id: &str,
        chapter: &ChapterUpsert,
    ) -> Result<String, RequestError> {
        let body = self.send_json("POST", &format!("/courses/{}/chapters", course_id), chapter)?;
        Self::created_id(body)
    }

    fn update_chapter(
        &self,
        chapter_id: &str,
        chapter: &ChapterUpsert,
    ) -> Result<(), RequestError> {
        self.send_json("PUT", &format!("/chapters/{}", chapter_id), chapter)?;
        Ok(())
    }

    fn delete_chapter(&self, chapter_id: &str) -> Result<(), RequestError> {
        self.request("DELETE", &format!("/chapters/{}", chapter_id))
            .call()?;
        Ok(())
    }

    fn list_assessments(&self, chapter_id: &str) -> Result<Vec<AssessmentRecord>, RequestError> {
        let body = self.get_json(&format!("/chapters/{}/assessments", chapter_id))?;
        let items = body
            .as_array()
            .ok_or_else(|| RequestError::ShapeError("assessment list is not an array".into()))?;
        Ok(items.iter().filter_map(parse_assessment).collect())
    }

    fn get_assessment(&self, assessment_id: &str) -> Result<AssessmentRecord, RequestError> {
        let body = self.get_json(&format!("/assessments/{}", assessment_id))?;
        parse_assessment(&body)
            .ok_or_else(|| RequestError::ShapeError("assessment has no id".into()))
    }

    fn create_assessment(
        &self,
        chapter_id: &str,
        assessment: &AssessmentUpsert,
    ) -> Result<String, RequestError> {
        let body = self.send_json(
            "POST",
            &format!("/chapters/{}/assessments", chapter_id),
            assessment,
        )?;
        Self::created_id(body)
    }

    fn update_assessment(
        &self,
        assessment_id: &str,
        assessment: &AssessmentUpsert,
    ) -> Result<(), RequestError> {
        self.send_json("PUT", &format!("/assessments/{}", assessment_id), assessment)?;
        Ok(())
    }

    fn delete_assessment(&self, assessment_id: &str) -> Result<(), RequestError> {
        self.request("DELETE", &format!("/assessments/{}", assessment_id))
            .call()?;
        Ok(())
    }

    fn upload_file(&self, file: &StagedFile) -> Result<String, RequestError> {
        let response = self
            .request(
                "POST",
                &format!("/uploads?filename={}", encode_query_component(&file.name)),
            )
            .set("Content-Type", "application/octet-stream")
            .send_bytes(&file.bytes)?;
        let body: Value = response.into_json()?;
        url_field(&payload(body))
    }

    fn upload_thumbnail(&self, data_url: &str) -> Result<String, RequestError> {
        if !data_url.starts_with("data:image/") {
            return Err(RequestError::ShapeError(
                "thumbnail must be an image data url".into(),
            ));
        }
        let body = self.send_json("POST", "/uploads/thumbnail", &json!({ "image": data_url }))?;
        url_field(&body)
    }

    fn list_instructors(&self) -> Result<Vec<Instructor>, RequestError> {
        let body = self.get_json("/instructors")?;
        let items = body
            .as_array()
            .ok_or_else(|| RequestError::ShapeError("instructor list is not an array".into()))?;
        Ok(items
            .iter()
            .filter_map(|item| {
                Some(Instructor {
                    id: id_field(item)?,
                    name: text_field(item, &["name", "fullName", "username"])
                        .unwrap_or_default(),
                })
            })
            .collect())
    }

    fn set_course_instructors(
        &self,
        course_id: &str,
        instructor_ids: &[String],
    ) -> Result<(), RequestError> {
        self.send_json(
            "PUT",
            &format!("/courses/{}/instructors", course_id),
            &json!({ "instructorIds": instructor_ids }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_envelope_unwraps_to_the_same_payload() {
        let inner = json!([{ "id": "ch-1" }]);
        let envelopes = vec![
            json!({ "data": { "data": inner.clone() } }),
            json!({ "data": { "result": inner.clone() } }),
            json!({ "data": { "items": inner.clone() } }),
            json!({ "data": inner.clone() }),
        ];
        for envelope in envelopes {
            assert_eq!(payload(envelope), inner);
        }
    }

    #[test]
    fn bare_bodies_pass_through_unwrapping() {
        let body = json!({ "id": "x", "title": "t" });
        assert_eq!(payload(body.clone()), body);
    }

    #[test]
    fn ids_are_read_under_any_known_spelling() {
        assert_eq!(id_field(&json!({ "id": 7 })).as_deref(), Some("7"));
        assert_eq!(id_field(&json!({ "_id": "abc" })).as_deref(), Some("abc"));
        assert_eq!(
            id_field(&json!({ "documentId": "d1" })).as_deref(),
            Some("d1")
        );
        assert_eq!(id_field(&json!({ "slug": "nope" })), None);
    }

    #[test]
    fn chapter_attachments_accept_strings_and_objects() {
        let chapter = json!({
            "id": "ch-1",
            "title": "Intro",
            "attachments": ["https://a/file.pdf", { "url": "https://b/img.png" }],
        });
        let record = parse_chapter(&chapter, 1).unwrap();
        assert_eq!(
            record.attachments,
            vec!["https://a/file.pdf", "https://b/img.png"]
        );
    }

    #[test]
    fn filenames_are_escaped_before_entering_the_query_string() {
        assert_eq!(
            encode_query_component("notes & final #2.pdf"),
            "notes%20%26%20final%20%232.pdf"
        );
        assert_eq!(encode_query_component("plain-name_1.pdf"), "plain-name_1.pdf");
    }

    #[test]
    fn assessment_time_limit_is_read_under_any_known_spelling() {
        for field in ["timeLimitSeconds", "timeLimit", "time_limit", "duration"] {
            let record = parse_assessment(&json!({ "id": "a", field: 600 })).unwrap();
            assert_eq!(record.time_limit_seconds, Some(600), "field {field}");
        }
    }
}

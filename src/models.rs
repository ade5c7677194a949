//! Core records shared by the ingestion pipeline and the vector index

use serde::{Deserialize, Serialize};

/// A course extracted from a source document.
///
/// The title is the identity key: ingestion deduplicates on exact title match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,

    /// Lessons in document order (not sorted by number)
    pub lessons: Vec<Lesson>,
}

/// A single lesson within a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub number: i64,
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A chunk of course text ready for embedding.
///
/// `chunk_index` increases across the whole course, not per lesson, so the
/// pair `(course_title, chunk_index)` identifies a chunk stably across
/// re-ingestion passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChunk {
    pub text: String,
    pub course_title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<i64>,

    pub chunk_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_serialization() {
        let course = Course {
            title: "Test Course".to_string(),
            url: Some("https://example.com/course".to_string()),
            instructor: None,
            lessons: vec![Lesson {
                number: 1,
                title: "Introduction".to_string(),
                url: None,
            }],
        };

        let json = serde_json::to_string(&course).unwrap();
        assert!(json.contains("Test Course"));
        assert!(!json.contains("instructor"));

        let parsed: Course = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.lessons.len(), 1);
        assert_eq!(parsed.lessons[0].number, 1);
    }
}

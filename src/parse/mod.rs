//! Course document parsing
//!
//! Course documents are plain text with a three-line header followed by
//! lesson sections:
//!
//! ```text
//! Course Title: Intro to Widgets
//! Course Link: https://example.com/widgets
//! Course Instructor: A. Smith
//!
//! Lesson 1: Basics
//! Lesson Link: https://example.com/widgets/lesson1
//! Widgets are small mechanical parts...
//! ```
//!
//! The three header labels must appear, in order, on the first three
//! non-empty lines. Lesson sections are delimited by `Lesson <n>:` markers
//! at line start and are kept in document order even when the numbers are
//! not.

use crate::error::{Error, Result};
use crate::models::{Course, Lesson};
use regex::Regex;
use std::sync::OnceLock;

/// A lesson together with its body text
#[derive(Debug, Clone)]
pub struct LessonContent {
    pub lesson: Lesson,
    pub body: String,
}

/// A fully parsed course document
#[derive(Debug, Clone)]
pub struct ParsedCourse {
    pub course: Course,

    /// Text between the header and the first lesson marker, if any
    pub preamble: String,

    /// Lessons in document order, each with its body text
    pub lessons: Vec<LessonContent>,
}

fn lesson_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Lesson\s+(\d+):\s*(.*)$").unwrap())
}

/// Parse a course document from raw text.
///
/// Fails with [`Error::MalformedDocument`] when the header labels are
/// missing, out of order, or the title is empty.
pub fn parse_course_document(content: &str) -> Result<ParsedCourse> {
    let mut lines = content.lines();

    let title = header_value(&mut lines, "Course Title:")?
        .ok_or_else(|| Error::MalformedDocument("empty course title".to_string()))?;
    let url = header_value(&mut lines, "Course Link:")?;
    let instructor = header_value(&mut lines, "Course Instructor:")?;

    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut lessons: Vec<LessonContent> = Vec::new();
    let mut current: Option<(Lesson, Vec<&str>)> = None;

    let mut iter = lines.peekable();
    while let Some(line) = iter.next() {
        if let Some(caps) = lesson_marker_re().captures(line) {
            if let Some((lesson, body)) = current.take() {
                lessons.push(finish_lesson(lesson, body));
            }

            // Captured digits always parse
            let number: i64 = caps[1].parse().map_err(|_| {
                Error::MalformedDocument(format!("invalid lesson number in '{line}'"))
            })?;
            let lesson_title = caps[2].trim().to_string();

            // An optional "Lesson Link:" line directly after the marker
            // belongs to the lesson, not its body.
            let mut lesson_url = None;
            if let Some(next) = iter.peek() {
                if let Some(rest) = next.strip_prefix("Lesson Link:") {
                    let rest = rest.trim();
                    if !rest.is_empty() {
                        lesson_url = Some(rest.to_string());
                    }
                    iter.next();
                }
            }

            current = Some((
                Lesson {
                    number,
                    title: lesson_title,
                    url: lesson_url,
                },
                Vec::new(),
            ));
        } else if let Some((_, ref mut body)) = current {
            body.push(line);
        } else {
            preamble_lines.push(line);
        }
    }

    if let Some((lesson, body)) = current.take() {
        lessons.push(finish_lesson(lesson, body));
    }

    let course = Course {
        title,
        url,
        instructor,
        lessons: lessons.iter().map(|lc| lc.lesson.clone()).collect(),
    };

    Ok(ParsedCourse {
        course,
        preamble: preamble_lines.join("\n").trim().to_string(),
        lessons,
    })
}

fn finish_lesson(lesson: Lesson, body: Vec<&str>) -> LessonContent {
    LessonContent {
        lesson,
        body: body.join("\n").trim().to_string(),
    }
}

/// Read the next non-empty line and strip the expected header label.
///
/// Returns `Ok(None)` when the label is present but has no content.
fn header_value<'a, I>(lines: &mut I, label: &str) -> Result<Option<String>>
where
    I: Iterator<Item = &'a str>,
{
    let line = lines
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::MalformedDocument(format!("missing '{label}' header")))?;

    let rest = line.trim().strip_prefix(label).ok_or_else(|| {
        Error::MalformedDocument(format!("expected '{label}' header, found '{}'", line.trim()))
    })?;

    let rest = rest.trim();
    if rest.is_empty() {
        Ok(None)
    } else {
        Ok(Some(rest.to_string()))
    }
}

/// Normalize whitespace for embedding: collapse runs of whitespace into
/// single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space && !result.is_empty() {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result.trim_end().to_string()
}

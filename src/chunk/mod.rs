//! Text chunking for course content
//!
//! Splits lesson bodies into overlapping windows while:
//! - Respecting sentence boundaries when possible, then word boundaries
//! - Never exceeding the configured window size
//! - Never losing characters: chunks are contiguous, overlapping substrings
//!   of the normalized text, so stripping the overlaps reconstructs it
//! - Prefixing each lesson's first chunk with a lesson-context header

use crate::config::ChunkConfig;
use crate::models::CourseChunk;
use crate::parse::{normalize_whitespace, ParsedCourse};
use unicode_segmentation::UnicodeSegmentation;

/// A half-open byte range into the normalized source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BreakPriority {
    Word,
    Sentence,
}

#[derive(Debug, Clone, Copy)]
struct BreakPoint {
    position: usize,
    priority: BreakPriority,
}

/// Split normalized text into overlapping spans of at most
/// `config.chunk_size` bytes with `config.chunk_overlap` bytes repeated
/// between consecutive spans.
///
/// Spans are contiguous: each span starts at or before the previous span's
/// end, and together they cover the whole text.
pub fn split_spans(text: &str, config: &ChunkConfig) -> Vec<TextSpan> {
    if text.is_empty() {
        return Vec::new();
    }

    let breaks = find_break_points(text);
    let mut spans = Vec::new();
    let mut start = 0;
    let mut prev_end = 0;

    while start < text.len() {
        let target = start.saturating_add(config.chunk_size);

        // Ends must advance past the previous span's end, or overlapping
        // windows could nest instead of tiling the text
        let floor = prev_end.max(start);

        let mut end = if target >= text.len() {
            text.len()
        } else {
            find_best_break(text, floor, target, &breaks)
        };

        // A single grapheme wider than the window still has to make progress
        if end <= floor {
            end = next_char_boundary(text, floor + 1);
        }

        spans.push(TextSpan { start, end });
        prev_end = end;

        if end >= text.len() {
            break;
        }

        let overlap_start = prev_char_boundary(text, end.saturating_sub(config.chunk_overlap));
        start = if overlap_start > start { overlap_start } else { end };
    }

    spans
}

/// Chunk a parsed course into indexable records.
///
/// The preamble (text before the first lesson marker) is chunked without a
/// lesson number. Each lesson's first chunk is prefixed with
/// `"Lesson {number} content: "`; the prefix is a strict addition, the
/// underlying window text is unchanged. `chunk_index` increases across the
/// whole course.
pub fn chunk_course(parsed: &ParsedCourse, config: &ChunkConfig) -> Vec<CourseChunk> {
    let mut chunks = Vec::new();
    let mut next_index: i64 = 0;

    let preamble = normalize_whitespace(&parsed.preamble);
    if !preamble.is_empty() {
        for span in split_spans(&preamble, config) {
            chunks.push(CourseChunk {
                text: preamble[span.start..span.end].to_string(),
                course_title: parsed.course.title.clone(),
                lesson_number: None,
                chunk_index: next_index,
            });
            next_index += 1;
        }
    }

    for lc in &parsed.lessons {
        let body = normalize_whitespace(&lc.body);
        if body.is_empty() {
            continue;
        }

        for (i, span) in split_spans(&body, config).iter().enumerate() {
            let window = &body[span.start..span.end];
            let text = if i == 0 {
                format!("Lesson {} content: {}", lc.lesson.number, window)
            } else {
                window.to_string()
            };

            chunks.push(CourseChunk {
                text,
                course_title: parsed.course.title.clone(),
                lesson_number: Some(lc.lesson.number),
                chunk_index: next_index,
            });
            next_index += 1;
        }
    }

    chunks
}

/// Collect candidate break positions: sentence starts rank above word starts.
fn find_break_points(text: &str) -> Vec<BreakPoint> {
    let mut points: Vec<BreakPoint> = Vec::new();

    for (offset, _) in text.split_sentence_bound_indices() {
        if offset > 0 {
            points.push(BreakPoint {
                position: offset,
                priority: BreakPriority::Sentence,
            });
        }
    }

    for (offset, _) in text.split_word_bound_indices() {
        if offset > 0 {
            points.push(BreakPoint {
                position: offset,
                priority: BreakPriority::Word,
            });
        }
    }

    points.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(b.priority.cmp(&a.priority))
    });
    points.dedup_by_key(|p| p.position);

    points
}

/// Find the best break in `(floor, target]`, preferring the latest sentence
/// boundary, then the latest word boundary, then a raw char boundary.
fn find_best_break(text: &str, floor: usize, target: usize, breaks: &[BreakPoint]) -> usize {
    let window: Vec<&BreakPoint> = breaks
        .iter()
        .filter(|p| p.position > floor && p.position <= target)
        .collect();

    if let Some(best) = window
        .iter()
        .filter(|p| p.priority == BreakPriority::Sentence)
        .last()
    {
        return best.position;
    }

    if let Some(best) = window.last() {
        return best.position;
    }

    prev_char_boundary(text, target)
}

/// Largest char boundary at or below `pos`
fn prev_char_boundary(text: &str, pos: usize) -> usize {
    let mut adjusted = pos.min(text.len());
    while adjusted > 0 && !text.is_char_boundary(adjusted) {
        adjusted -= 1;
    }
    adjusted
}

/// Smallest char boundary at or above `pos`
fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut adjusted = pos.min(text.len());
    while adjusted < text.len() && !text.is_char_boundary(adjusted) {
        adjusted += 1;
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lesson;
    use crate::parse::{LessonContent, ParsedCourse};

    fn config(size: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        }
    }

    fn course_with_lessons(lessons: Vec<(i64, &str)>) -> ParsedCourse {
        ParsedCourse {
            course: crate::models::Course {
                title: "Test Course".to_string(),
                url: None,
                instructor: None,
                lessons: lessons
                    .iter()
                    .map(|(n, _)| Lesson {
                        number: *n,
                        title: format!("Lesson {n}"),
                        url: None,
                    })
                    .collect(),
            },
            preamble: String::new(),
            lessons: lessons
                .into_iter()
                .map(|(n, body)| LessonContent {
                    lesson: Lesson {
                        number: n,
                        title: format!("Lesson {n}"),
                        url: None,
                    },
                    body: body.to_string(),
                })
                .collect(),
        }
    }

    /// Stitch spans back together, dropping each span's overlapping prefix.
    fn reconstruct(text: &str, spans: &[TextSpan]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            assert!(span.start <= covered, "gap between spans");
            assert!(span.end > covered || span.end == text.len());
            out.push_str(&text[covered.max(span.start)..span.end]);
            covered = span.end;
        }
        out
    }

    #[test]
    fn test_short_text_single_span() {
        let text = "This is a short text.";
        let spans = split_spans(text, &config(500, 50));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0], TextSpan { start: 0, end: text.len() });
    }

    #[test]
    fn test_spans_never_exceed_window() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(40);
        let text = normalize_whitespace(&text);
        let cfg = config(200, 40);
        let spans = split_spans(&text, &cfg);

        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.end - span.start <= cfg.chunk_size);
            assert!(span.end > span.start);
        }
    }

    #[test]
    fn test_reconstruction_exact() {
        let text = "One sentence here. Another one follows! A third asks a question? \
                    Then a much longer sentence with many words rolls on and on."
            .to_string();
        let text = normalize_whitespace(&text);

        for (size, overlap) in [(40, 10), (60, 20), (25, 5), (500, 100)] {
            let spans = split_spans(&text, &config(size, overlap));
            assert_eq!(reconstruct(&text, &spans), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_consecutive_spans_overlap() {
        let text = "word ".repeat(100);
        let text = normalize_whitespace(&text);
        let cfg = config(100, 20);
        let spans = split_spans(&text, &cfg);

        for pair in spans.windows(2) {
            let overlap = pair[0].end.saturating_sub(pair[1].start);
            assert!(overlap >= cfg.chunk_overlap, "overlap was {overlap}");
            assert!(pair[1].start > pair[0].start, "spans must advance");
        }
    }

    #[test]
    fn test_breaks_prefer_sentence_boundaries() {
        let text = "First sentence ends here. Second sentence is rather long and keeps going.";
        let spans = split_spans(text, &config(40, 5));
        // "First sentence ends here. " is 26 bytes; the first span should end
        // exactly at the sentence boundary rather than mid-word at byte 40.
        assert_eq!(&text[spans[0].start..spans[0].end], "First sentence ends here. ");
    }

    #[test]
    fn test_no_mid_word_split() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let spans = split_spans(text, &config(20, 4));
        for span in &spans {
            let piece = &text[span.start..span.end];
            // Every span should end at a word edge (trailing space or text end)
            assert!(
                piece.ends_with(' ') || span.end == text.len(),
                "span ended mid-word: {piece:?}"
            );
        }
    }

    #[test]
    fn test_multibyte_safety() {
        let text = "日本語のテキストです。 これは二番目の文です。 そして三番目。";
        let spans = split_spans(text, &config(30, 6));
        for span in &spans {
            assert!(text.is_char_boundary(span.start));
            assert!(text.is_char_boundary(span.end));
        }
        assert_eq!(reconstruct(text, &spans), text);
    }

    #[test]
    fn test_lesson_prefix_on_first_chunk_only() {
        let body = "Sentence one is here. Sentence two is here. Sentence three is here. \
                    Sentence four is here. Sentence five is here.";
        let parsed = course_with_lessons(vec![(1, body)]);
        let chunks = chunk_course(&parsed, &config(60, 10));

        assert!(chunks.len() > 1);
        assert!(chunks[0].text.starts_with("Lesson 1 content: "));
        for chunk in &chunks[1..] {
            assert!(!chunk.text.starts_with("Lesson 1 content:"));
        }
    }

    #[test]
    fn test_prefix_is_strict_addition() {
        let body = "Widgets are small mechanical parts used in assembly.";
        let parsed = course_with_lessons(vec![(1, body)]);
        let chunks = chunk_course(&parsed, &config(500, 50));

        assert_eq!(chunks.len(), 1);
        let stripped = chunks[0]
            .text
            .strip_prefix("Lesson 1 content: ")
            .expect("prefix missing");
        assert_eq!(stripped, normalize_whitespace(body));
    }

    #[test]
    fn test_chunk_index_is_course_global() {
        let parsed = course_with_lessons(vec![
            (1, "Alpha beta gamma delta epsilon zeta eta theta."),
            (2, "Iota kappa lambda mu nu xi omicron pi rho sigma."),
        ]);
        let chunks = chunk_course(&parsed, &config(30, 5));

        let indices: Vec<i64> = chunks.iter().map(|c| c.chunk_index).collect();
        let expected: Vec<i64> = (0..chunks.len() as i64).collect();
        assert_eq!(indices, expected);

        // Second lesson's chunks continue the counter rather than restarting
        let lesson2_first = chunks
            .iter()
            .find(|c| c.lesson_number == Some(2))
            .expect("no lesson 2 chunks");
        assert!(lesson2_first.chunk_index > 0);
    }

    #[test]
    fn test_empty_lesson_produces_no_chunks() {
        let parsed = course_with_lessons(vec![(1, "   "), (2, "Real content here.")]);
        let chunks = chunk_course(&parsed, &config(100, 10));
        assert!(chunks.iter().all(|c| c.lesson_number == Some(2)));
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
    }

    #[test]
    fn test_preamble_chunks_have_no_lesson_number() {
        let mut parsed = course_with_lessons(vec![(1, "Lesson body.")]);
        parsed.preamble = "Welcome to the course overview.".to_string();
        let chunks = chunk_course(&parsed, &config(100, 10));

        assert_eq!(chunks[0].lesson_number, None);
        assert_eq!(chunks[0].text, "Welcome to the course overview.");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].lesson_number, Some(1));
        assert_eq!(chunks[1].chunk_index, 1);
    }
}

//! Ask and search command implementations

use crate::engine::{QueryOutcome, RagEngine};
use crate::error::Result;
use crate::index::SearchResults;

/// Ask a question through the full generation loop
pub async fn cmd_ask(
    engine: &RagEngine,
    question: &str,
    session_id: Option<&str>,
) -> Result<QueryOutcome> {
    engine.query(question, session_id).await
}

/// Search the content collection directly, bypassing the model
pub async fn cmd_search(
    engine: &RagEngine,
    query: &str,
    course: Option<&str>,
    lesson: Option<i64>,
    limit: usize,
) -> SearchResults {
    engine.index().search(query, course, lesson, Some(limit)).await
}

/// Print an answer with its sources
pub fn print_query_outcome(outcome: &QueryOutcome) {
    println!("\n{}\n", outcome.answer);

    if !outcome.sources.is_empty() {
        println!("Sources:");
        for source in &outcome.sources {
            match &source.url {
                Some(url) => println!("  - {} <{}>", source.label, url),
                None => println!("  - {}", source.label),
            }
        }
    }
}

/// Print raw search results
pub fn print_search_results(results: &SearchResults) {
    if let Some(error) = &results.error {
        eprintln!("Search failed: {error}");
        return;
    }

    if results.is_empty() {
        println!("No results.");
        return;
    }

    println!("\nFound {} results:\n", results.documents.len());

    for ((document, meta), distance) in results
        .documents
        .iter()
        .zip(results.metadata.iter())
        .zip(results.distances.iter())
    {
        let header = match meta.lesson_number {
            Some(n) => format!("{} - Lesson {}", meta.course_title, n),
            None => meta.course_title.clone(),
        };
        println!("[{header}] (distance: {distance:.3})");
        println!("{document}\n");
    }
}

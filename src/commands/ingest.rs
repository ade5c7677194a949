//! Ingest command implementation

use crate::engine::{IngestStats, RagEngine};
use crate::error::{Error, Result};
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Duration;

/// Ingest a folder of course documents
pub async fn cmd_ingest(engine: &RagEngine, path: &Path, clear: bool) -> Result<IngestStats> {
    if !path.is_dir() {
        return Err(Error::Config(format!(
            "Not a directory: {}",
            path.display()
        )));
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Ingesting course documents from {}", path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = engine.add_course_folder(path, clear).await;

    spinner.finish_and_clear();
    result
}

/// Print ingest statistics to console
pub fn print_ingest_stats(stats: &IngestStats) {
    println!("\n✓ Ingestion complete");
    println!("  Courses added: {}", stats.courses_added);
    println!("  Courses skipped (already indexed): {}", stats.courses_skipped);
    println!("  Files failed to parse: {}", stats.files_failed);
    println!("  Chunks created: {}", stats.chunks_added);
}

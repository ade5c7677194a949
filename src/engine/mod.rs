//! The retrieval-augmented answering engine
//!
//! Ties the pipeline together: parses and chunks course documents into the
//! vector index at ingestion time, and at query time runs the tool-mediated
//! generation loop with a fresh search tool per query.

use crate::chunk::chunk_course;
use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::llm::{AnswerGenerator, ChatClient, OpenAiCompatibleClient};
use crate::parse::parse_course_document;
use crate::session::SessionManager;
use crate::tools::{CourseSearchTool, Source, ToolManager};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of answering one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Statistics from a folder ingestion pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub courses_added: usize,
    pub courses_skipped: usize,
    pub files_failed: usize,
    pub chunks_added: usize,
}

/// Catalog analytics for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: i64,
    pub total_chunks: i64,
    pub course_titles: Vec<String>,
}

/// Engine handle
pub struct RagEngine {
    config: Config,
    index: Arc<VectorIndex>,
    generator: AnswerGenerator,
    sessions: SessionManager,
}

impl RagEngine {
    /// Open the engine with the configured embedder and chat client
    pub async fn open(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index = Arc::new(VectorIndex::open(&config, embedder).await?);
        let client = OpenAiCompatibleClient::new(&config.generation);
        Ok(Self::assemble(config, index, Box::new(client)))
    }

    /// Assemble from parts (lets callers substitute the chat client)
    pub fn assemble(config: Config, index: Arc<VectorIndex>, client: Box<dyn ChatClient>) -> Self {
        let sessions = SessionManager::new(config.session.max_history);
        Self {
            generator: AnswerGenerator::new(client),
            index,
            sessions,
            config,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Parse, chunk, and index one course document
    pub async fn add_course_document(&self, path: &Path) -> Result<(String, usize)> {
        let content = tokio::fs::read_to_string(path).await?;
        let parsed = parse_course_document(&content)?;
        let chunks = chunk_course(&parsed, &self.config.chunk);

        self.index.upsert_course_metadata(&parsed.course).await?;
        self.index.upsert_chunks(&chunks).await?;

        info!(
            "Indexed course '{}' ({} chunks)",
            parsed.course.title,
            chunks.len()
        );
        Ok((parsed.course.title, chunks.len()))
    }

    /// Ingest every `.txt` course document in a folder.
    ///
    /// Idempotent by course title: documents whose title is already in the
    /// catalog are skipped unless `clear_existing` drops both collections
    /// first. Malformed documents are logged and skipped; other files
    /// proceed.
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<IngestStats> {
        if clear_existing {
            info!("Clearing existing index before ingestion");
            self.index.clear_all_data().await?;
        }

        let mut existing: HashSet<String> = self
            .index
            .get_existing_course_titles()
            .await?
            .into_iter()
            .collect();

        let mut files: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().map_or(false, |ext| ext == "txt")
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        let mut stats = IngestStats::default();

        for path in files {
            let content = tokio::fs::read_to_string(&path).await?;

            let parsed = match parse_course_document(&content) {
                Ok(parsed) => parsed,
                Err(Error::MalformedDocument(reason)) => {
                    warn!("Skipping {}: {}", path.display(), reason);
                    stats.files_failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if existing.contains(&parsed.course.title) {
                debug!(
                    "Course '{}' already indexed, skipping {}",
                    parsed.course.title,
                    path.display()
                );
                stats.courses_skipped += 1;
                continue;
            }

            let chunks = chunk_course(&parsed, &self.config.chunk);
            self.index.upsert_course_metadata(&parsed.course).await?;
            self.index.upsert_chunks(&chunks).await?;

            existing.insert(parsed.course.title.clone());
            stats.courses_added += 1;
            stats.chunks_added += chunks.len();
        }

        info!(
            "Folder ingestion complete: {} added, {} skipped, {} failed",
            stats.courses_added, stats.courses_skipped, stats.files_failed
        );
        Ok(stats)
    }

    /// Answer a question, letting the model decide whether to search.
    ///
    /// A fresh search tool and manager are built per query so the
    /// last-sources buffer never crosses sessions.
    pub async fn query(&self, text: &str, session_id: Option<&str>) -> Result<QueryOutcome> {
        let history = session_id.and_then(|id| self.sessions.get_formatted_history(id));

        let mut manager = ToolManager::new();
        manager.register(Arc::new(CourseSearchTool::new(self.index.clone())));

        let prompt = format!("Answer this question about course materials: {text}");
        let answer = self
            .generator
            .generate(
                &prompt,
                history.as_deref(),
                &manager.definitions(),
                Some(&manager),
            )
            .await?;

        let sources = manager.drain_last_sources();

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, text, &answer);
        }

        Ok(QueryOutcome { answer, sources })
    }

    /// Catalog analytics for status reporting
    pub async fn analytics(&self) -> Result<CourseAnalytics> {
        Ok(CourseAnalytics {
            total_courses: self.index.course_count().await?,
            total_chunks: self.index.chunk_count().await?,
            course_titles: self.index.get_existing_course_titles().await?,
        })
    }
}

//! Dual-collection vector index over SQLite
//!
//! Two collections share one embedding function:
//! - *catalog*: one row per course, embedded over the title, used for fuzzy
//!   course-name resolution and link lookups
//! - *content*: one row per chunk, embedded over the chunk text, used for
//!   metadata-filtered nearest-neighbor search
//!
//! Embeddings are stored as little-endian f32 BLOBs and scored with an
//! in-process cosine scan (distance = 1 - cosine). Content ids derive
//! deterministically from `(course_title, chunk_index)` so re-ingestion
//! overwrites rather than duplicates.

mod payload;

pub use payload::*;

use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::models::{Course, CourseChunk, Lesson};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// Vector index handle
pub struct VectorIndex {
    pool: SqlitePool,
    embedder: Box<dyn Embedder>,
    max_results: usize,
    resolve_distance_cutoff: Option<f32>,
    batch_size: usize,
}

impl VectorIndex {
    /// Open (or create) the index at the configured database path
    pub async fn open(config: &Config, embedder: Box<dyn Embedder>) -> Result<Self> {
        let db_path = &config.paths.db_file;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!("Opening index database at {:?}", db_path);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(|e| Error::Index(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let index = Self {
            pool,
            embedder,
            max_results: config.search.max_results,
            resolve_distance_cutoff: config.search.resolve_distance_cutoff,
            batch_size: config.embedding.batch_size,
        };

        index.ensure_schema().await?;
        Ok(index)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog (
                title TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                instructor TEXT,
                course_url TEXT,
                lesson_count INTEGER NOT NULL,
                lessons_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content (
                id TEXT PRIMARY KEY,
                course_title TEXT NOT NULL,
                lesson_number INTEGER,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_content_course ON content(course_title)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Stable content id for a chunk
    fn chunk_id(course_title: &str, chunk_index: i64) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(course_title.as_bytes());
        hasher.update(&chunk_index.to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
    }

    /// Embed the course title and store (or overwrite) its catalog entry
    pub async fn upsert_course_metadata(&self, course: &Course) -> Result<()> {
        let embedding = self.embed_one(&course.title).await?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        sqlx::query(
            r#"
            INSERT INTO catalog (title, embedding, instructor, course_url, lesson_count, lessons_json)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                embedding = excluded.embedding,
                instructor = excluded.instructor,
                course_url = excluded.course_url,
                lesson_count = excluded.lesson_count,
                lessons_json = excluded.lessons_json
            "#,
        )
        .bind(&course.title)
        .bind(vec_to_blob(&embedding))
        .bind(&course.instructor)
        .bind(&course.url)
        .bind(course.lessons.len() as i64)
        .bind(lessons_json)
        .execute(&self.pool)
        .await?;

        debug!("Upserted catalog entry for '{}'", course.title);
        Ok(())
    }

    /// Embed and store chunks into the content collection
    pub async fn upsert_chunks(&self, chunks: &[CourseChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), texts, self.batch_size).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "Embedded {} of {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let updated_at = chrono::Utc::now().to_rfc3339();

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            sqlx::query(
                r#"
                INSERT INTO content (id, course_title, lesson_number, chunk_index, text, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    course_title = excluded.course_title,
                    lesson_number = excluded.lesson_number,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(Self::chunk_id(&chunk.course_title, chunk.chunk_index))
            .bind(&chunk.course_title)
            .bind(chunk.lesson_number)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(vec_to_blob(embedding))
            .bind(&updated_at)
            .execute(&self.pool)
            .await?;
        }

        debug!("Upserted {} chunks", chunks.len());
        Ok(())
    }

    /// Resolve a fuzzy course name against the catalog.
    ///
    /// Returns the closest title by embedding distance, or `None` when the
    /// catalog is empty. With `resolve_distance_cutoff` configured, a top
    /// match farther than the cutoff also resolves to `None`.
    pub async fn resolve_course_name(&self, query: &str) -> Result<Option<String>> {
        let query_vec = self.embed_one(query).await?;

        let rows = sqlx::query("SELECT title, embedding FROM catalog")
            .fetch_all(&self.pool)
            .await?;

        let best = rows
            .iter()
            .map(|row| {
                let title: String = row.get("title");
                let blob: Vec<u8> = row.get("embedding");
                let distance = 1.0 - cosine_similarity(&query_vec, &blob_to_vec(&blob));
                (title, distance)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((title, distance)) => {
                if let Some(cutoff) = self.resolve_distance_cutoff {
                    if distance > cutoff {
                        debug!(
                            "Closest course '{}' at distance {:.3} beyond cutoff {:.3}",
                            title, distance, cutoff
                        );
                        return Ok(None);
                    }
                }
                Ok(Some(title))
            }
            None => Ok(None),
        }
    }

    /// Search the content collection.
    ///
    /// Faults are converted into `SearchResults.error` rather than returned
    /// as `Err`; callers must check `error` before using the data.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<i64>,
        max_results: Option<usize>,
    ) -> SearchResults {
        match self
            .try_search(query, course_name, lesson_number, max_results)
            .await
        {
            Ok(results) => results,
            Err(e) => SearchResults::from_error(format!("Search error: {e}")),
        }
    }

    async fn try_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<i64>,
        max_results: Option<usize>,
    ) -> Result<SearchResults> {
        let resolved_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchResults::from_error(format!(
                        "No course found matching '{name}'"
                    )))
                }
            },
            None => None,
        };

        let query_vec = self.embed_one(query).await?;
        let top_k = max_results.unwrap_or(self.max_results);

        let rows = match (&resolved_title, lesson_number) {
            (Some(title), Some(lesson)) => {
                sqlx::query(
                    "SELECT text, course_title, lesson_number, chunk_index, embedding \
                     FROM content WHERE course_title = ? AND lesson_number = ?",
                )
                .bind(title)
                .bind(lesson)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(title), None) => {
                sqlx::query(
                    "SELECT text, course_title, lesson_number, chunk_index, embedding \
                     FROM content WHERE course_title = ?",
                )
                .bind(title)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(lesson)) => {
                sqlx::query(
                    "SELECT text, course_title, lesson_number, chunk_index, embedding \
                     FROM content WHERE lesson_number = ?",
                )
                .bind(lesson)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query(
                    "SELECT text, course_title, lesson_number, chunk_index, embedding \
                     FROM content",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut scored: Vec<(String, ChunkPayload, f32)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let distance = 1.0 - cosine_similarity(&query_vec, &blob_to_vec(&blob));
                (
                    row.get("text"),
                    ChunkPayload {
                        course_title: row.get("course_title"),
                        lesson_number: row.get("lesson_number"),
                        chunk_index: row.get("chunk_index"),
                    },
                    distance,
                )
            })
            .collect();

        scored.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        let mut results = SearchResults::default();
        for (text, payload, distance) in scored {
            results.documents.push(text);
            results.metadata.push(payload);
            results.distances.push(distance);
        }

        Ok(results)
    }

    /// Titles currently present in the catalog
    pub async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT title FROM catalog ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("title")).collect())
    }

    /// Number of courses in the catalog
    pub async fn course_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM catalog")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Number of chunks in the content collection
    pub async fn chunk_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM content")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Course link from catalog metadata
    pub async fn get_course_link(&self, course_title: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT course_url FROM catalog WHERE title = ?")
            .bind(course_title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|r| r.get("course_url")))
    }

    /// Lesson link reconstructed from the catalog's lessons_json
    pub async fn get_lesson_link(
        &self,
        course_title: &str,
        lesson_number: i64,
    ) -> Result<Option<String>> {
        let row = sqlx::query("SELECT lessons_json FROM catalog WHERE title = ?")
            .bind(course_title)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lessons_json: String = row.get("lessons_json");
        let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json)?;
        Ok(lessons
            .into_iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.url))
    }

    /// Delete and recreate both collections empty
    pub async fn clear_all_data(&self) -> Result<()> {
        info!("Clearing catalog and content collections");
        sqlx::query("DROP TABLE IF EXISTS catalog")
            .execute(&self.pool)
            .await?;
        sqlx::query("DROP TABLE IF EXISTS content")
            .execute(&self.pool)
            .await?;
        self.ensure_schema().await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::HashEmbedder;
    use super::*;
    use crate::config::Config;
    use crate::models::Lesson;
    use tempfile::TempDir;

    async fn open_index(tmp: &TempDir) -> VectorIndex {
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("index.db");
        VectorIndex::open(&config, Box::new(HashEmbedder::new()))
            .await
            .unwrap()
    }

    fn widgets_course() -> Course {
        Course {
            title: "Intro to Widgets".to_string(),
            url: Some("https://example.com/widgets".to_string()),
            instructor: Some("A. Smith".to_string()),
            lessons: vec![Lesson {
                number: 1,
                title: "Basics".to_string(),
                url: Some("https://example.com/widgets/lesson1".to_string()),
            }],
        }
    }

    fn cooking_course() -> Course {
        Course {
            title: "Cooking Fundamentals".to_string(),
            url: None,
            instructor: None,
            lessons: vec![],
        }
    }

    fn chunk(course: &str, lesson: Option<i64>, index: i64, text: &str) -> CourseChunk {
        CourseChunk {
            text: text.to_string(),
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    #[tokio::test]
    async fn test_idempotent_catalog_upsert() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index.upsert_course_metadata(&widgets_course()).await.unwrap();
        index.upsert_course_metadata(&widgets_course()).await.unwrap();

        assert_eq!(index.course_count().await.unwrap(), 1);
        assert_eq!(
            index.get_existing_course_titles().await.unwrap(),
            vec!["Intro to Widgets".to_string()]
        );
    }

    #[tokio::test]
    async fn test_idempotent_chunk_upsert() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        let chunks = vec![
            chunk("Intro to Widgets", Some(1), 0, "Widgets are parts."),
            chunk("Intro to Widgets", Some(1), 1, "More about widgets."),
        ];
        index.upsert_chunks(&chunks).await.unwrap();
        index.upsert_chunks(&chunks).await.unwrap();

        assert_eq!(index.chunk_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_resolve_empty_catalog() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        assert_eq!(index.resolve_course_name("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_fuzzy_name() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index.upsert_course_metadata(&widgets_course()).await.unwrap();
        index.upsert_course_metadata(&cooking_course()).await.unwrap();

        let resolved = index.resolve_course_name("Widgets").await.unwrap();
        assert_eq!(resolved.as_deref(), Some("Intro to Widgets"));

        let resolved = index.resolve_course_name("Cooking").await.unwrap();
        assert_eq!(resolved.as_deref(), Some("Cooking Fundamentals"));
    }

    #[tokio::test]
    async fn test_resolution_miss_short_circuits() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        // Empty catalog: any course filter is a resolution miss
        let results = index
            .search("widgets", Some("Widgets"), None, None)
            .await;
        assert_eq!(
            results.error.as_deref(),
            Some("No course found matching 'Widgets'")
        );
        assert!(results.documents.is_empty());
        assert!(results.metadata.is_empty());
        assert!(results.distances.is_empty());
    }

    #[tokio::test]
    async fn test_resolution_cutoff() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("index.db");
        config.search.resolve_distance_cutoff = Some(0.5);
        let index = VectorIndex::open(&config, Box::new(HashEmbedder::new()))
            .await
            .unwrap();

        index.upsert_course_metadata(&widgets_course()).await.unwrap();

        // Shared word resolves within cutoff
        let resolved = index.resolve_course_name("Widgets").await.unwrap();
        assert_eq!(resolved.as_deref(), Some("Intro to Widgets"));

        // Unrelated query lands beyond the cutoff
        let resolved = index.resolve_course_name("zzz qqq xxx").await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_empty_content_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index.upsert_course_metadata(&widgets_course()).await.unwrap();

        let results = index.search("widgets", Some("Widgets"), None, None).await;
        assert!(results.error.is_none());
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_filter_correctness() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index.upsert_course_metadata(&widgets_course()).await.unwrap();
        index.upsert_course_metadata(&cooking_course()).await.unwrap();
        index
            .upsert_chunks(&[
                chunk("Intro to Widgets", Some(1), 0, "Widgets are small parts."),
                chunk("Intro to Widgets", Some(2), 1, "Widget assembly lines."),
                chunk("Cooking Fundamentals", Some(1), 0, "Widgets of the kitchen: knives."),
            ])
            .await
            .unwrap();

        // Conjunction of course + lesson filters
        let results = index
            .search("widgets", Some("Intro to Widgets"), Some(1), None)
            .await;
        assert!(results.error.is_none());
        assert!(!results.documents.is_empty());
        for meta in &results.metadata {
            assert_eq!(meta.course_title, "Intro to Widgets");
            assert_eq!(meta.lesson_number, Some(1));
        }

        // Lesson-only filter spans courses
        let results = index.search("widgets", None, Some(1), Some(10)).await;
        assert!(results.error.is_none());
        for meta in &results.metadata {
            assert_eq!(meta.lesson_number, Some(1));
        }
        let titles: Vec<&str> = results
            .metadata
            .iter()
            .map(|m| m.course_title.as_str())
            .collect();
        assert!(titles.contains(&"Intro to Widgets"));
        assert!(titles.contains(&"Cooking Fundamentals"));

        // Unfiltered search may return chunks from any course
        let results = index.search("widgets", None, None, Some(10)).await;
        assert_eq!(results.documents.len(), 3);
        assert_eq!(results.documents.len(), results.metadata.len());
        assert_eq!(results.documents.len(), results.distances.len());
    }

    #[tokio::test]
    async fn test_search_ranks_by_distance() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index
            .upsert_chunks(&[
                chunk("C", Some(1), 0, "Completely unrelated prose about cats."),
                chunk("C", Some(1), 1, "Widgets are small mechanical parts."),
            ])
            .await
            .unwrap();

        let results = index.search("widgets mechanical parts", None, None, Some(1)).await;
        assert_eq!(results.documents.len(), 1);
        assert!(results.documents[0].contains("Widgets"));

        for pair in results.distances.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[tokio::test]
    async fn test_max_results_default_and_override() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        let chunks: Vec<CourseChunk> = (0..10)
            .map(|i| chunk("C", Some(1), i, &format!("widget text number {i}")))
            .collect();
        index.upsert_chunks(&chunks).await.unwrap();

        // Config default is 5
        let results = index.search("widget", None, None, None).await;
        assert_eq!(results.documents.len(), 5);

        let results = index.search("widget", None, None, Some(2)).await;
        assert_eq!(results.documents.len(), 2);
    }

    #[tokio::test]
    async fn test_link_lookups() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index.upsert_course_metadata(&widgets_course()).await.unwrap();

        assert_eq!(
            index.get_course_link("Intro to Widgets").await.unwrap(),
            Some("https://example.com/widgets".to_string())
        );
        assert_eq!(
            index.get_lesson_link("Intro to Widgets", 1).await.unwrap(),
            Some("https://example.com/widgets/lesson1".to_string())
        );
        assert_eq!(index.get_lesson_link("Intro to Widgets", 9).await.unwrap(), None);
        assert_eq!(index.get_lesson_link("Nope", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_all_data() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp).await;

        index.upsert_course_metadata(&widgets_course()).await.unwrap();
        index
            .upsert_chunks(&[chunk("Intro to Widgets", Some(1), 0, "text")])
            .await
            .unwrap();

        index.clear_all_data().await.unwrap();

        assert_eq!(index.course_count().await.unwrap(), 0);
        assert_eq!(index.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();

        {
            let index = open_index(&tmp).await;
            index.upsert_course_metadata(&widgets_course()).await.unwrap();
        }

        let index = open_index(&tmp).await;
        assert_eq!(index.course_count().await.unwrap(), 1);
    }
}

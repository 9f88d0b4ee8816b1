//! SQLite-backed vector index.
//!
//! Vectors are stored as little-endian `f32` blobs and scored by brute force
//! under the collection's metric. Suitable for offline deployments and
//! corpora of a few thousand Q&A pairs.

use super::{CollectionInfo, CollectionSpec, Distance, VectorIndex};
use crate::types::{IndexedPoint, PointId, SearchHit};
use async_trait::async_trait;
use mathtutor_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimensions INTEGER NOT NULL,
    distance TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS points (
    collection TEXT NOT NULL,
    id INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (collection, id),
    FOREIGN KEY (collection) REFERENCES collections(name)
);
"#;

/// Local vector index in a single SQLite file.
///
/// The connection sits behind a mutex and every call runs on the blocking
/// pool, so the handle can be shared across tasks.
#[derive(Clone)]
pub struct SqliteIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIndex {
    /// Open or create the index database.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Index(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Self::init(conn)
    }

    /// In-memory index, gone when the handle drops.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Index("SQLite connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AppError::Index(format!("SQLite task failed: {}", e)))?
    }
}

fn sql_err(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Index(format!("{}: {}", context, e))
}

/// Dimension and metric of a collection, if it exists.
fn collection_shape(conn: &Connection, name: &str) -> AppResult<Option<(usize, Distance)>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT dimensions, distance FROM collections WHERE name = ?1",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(sql_err("Failed to read collection"))?;

    match row {
        Some((dimensions, distance)) => {
            Ok(Some((dimensions as usize, Distance::parse(&distance)?)))
        }
        None => Ok(None),
    }
}

fn require_shape(conn: &Connection, name: &str) -> AppResult<(usize, Distance)> {
    collection_shape(conn, name)?
        .ok_or_else(|| AppError::Index(format!("Collection '{}' does not exist", name)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn collection_exists(&self, name: &str) -> AppResult<bool> {
        let name = name.to_string();
        self.run(move |conn| Ok(collection_shape(conn, &name)?.is_some()))
            .await
    }

    async fn delete_collection(&self, name: &str) -> AppResult<()> {
        let name = name.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM points WHERE collection = ?1", params![name])
                .map_err(sql_err("Failed to delete points"))?;
            conn.execute("DELETE FROM collections WHERE name = ?1", params![name])
                .map_err(sql_err("Failed to delete collection"))?;
            Ok(())
        })
        .await
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        let spec = spec.clone();
        self.run(move |conn| {
            if collection_shape(conn, &spec.name)?.is_some() {
                return Err(AppError::Index(format!(
                    "Collection '{}' already exists",
                    spec.name
                )));
            }
            conn.execute(
                "INSERT INTO collections (name, dimensions, distance) VALUES (?1, ?2, ?3)",
                params![spec.name, spec.dimensions as i64, spec.distance.as_str()],
            )
            .map_err(sql_err("Failed to create collection"))?;
            Ok(())
        })
        .await
    }

    async fn upsert(&self, collection: &str, points: &[IndexedPoint]) -> AppResult<()> {
        let collection = collection.to_string();
        let points = points.to_vec();
        self.run(move |conn| {
            let (dimensions, _) = require_shape(conn, &collection)?;

            let tx = conn
                .unchecked_transaction()
                .map_err(sql_err("Failed to begin transaction"))?;
            for point in &points {
                if point.vector.len() != dimensions {
                    return Err(AppError::Config(format!(
                        "Point {} has {} dimensions, collection '{}' expects {}",
                        point.id,
                        point.vector.len(),
                        collection,
                        dimensions
                    )));
                }
                let payload = serde_json::to_string(&point.payload)?;
                tx.execute(
                    "INSERT OR REPLACE INTO points (collection, id, embedding, payload)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        collection,
                        point.id as i64,
                        embedding_to_bytes(&point.vector),
                        payload
                    ],
                )
                .map_err(sql_err("Failed to insert point"))?;
            }
            tx.commit().map_err(sql_err("Failed to commit points"))?;
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let collection = collection.to_string();
        let query = vector.to_vec();
        self.run(move |conn| {
            let (dimensions, distance) = require_shape(conn, &collection)?;
            if query.len() != dimensions {
                return Err(AppError::Config(format!(
                    "Query vector has {} dimensions, collection '{}' expects {}",
                    query.len(),
                    collection,
                    dimensions
                )));
            }

            let mut stmt = conn
                .prepare("SELECT id, embedding, payload FROM points WHERE collection = ?1")
                .map_err(sql_err("Failed to prepare query"))?;
            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(sql_err("Failed to query points"))?;

            let mut hits = Vec::new();
            for row in rows {
                let (id, bytes, payload) = row.map_err(sql_err("Failed to read point"))?;
                let embedding = bytes_to_embedding(&bytes)?;
                let payload: Map<String, Value> = serde_json::from_str(&payload)?;
                hits.push(SearchHit {
                    id: PointId::Num(id as u64),
                    score: Some(distance.score(&query, &embedding)),
                    payload,
                });
            }

            hits.sort_by(|a, b| {
                distance.compare(a.score.unwrap_or_default(), b.score.unwrap_or_default())
            });
            hits.truncate(limit);

            tracing::debug!(
                "Retrieved {} points (requested top-{})",
                hits.len(),
                limit
            );
            Ok(hits)
        })
        .await
    }

    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        let name = name.to_string();
        self.run(move |conn| {
            let Some((dimensions, distance)) = collection_shape(conn, &name)? else {
                return Ok(None);
            };
            let points_count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM points WHERE collection = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .map_err(sql_err("Failed to count points"))?;

            Ok(Some(CollectionInfo {
                name,
                dimensions,
                distance,
                points_count: points_count as u64,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointPayload;
    use tempfile::TempDir;

    fn spec(distance: Distance) -> CollectionSpec {
        CollectionSpec {
            name: "math_qa".to_string(),
            dimensions: 2,
            distance,
        }
    }

    fn point(id: u64, vector: Vec<f32>, question: &str) -> IndexedPoint {
        IndexedPoint {
            id,
            vector,
            payload: PointPayload {
                text: format!("Question: {}\nAnswer: a", question),
                source_question: question.to_string(),
                source_answer: "a".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let temp = TempDir::new().unwrap();
        let index = SqliteIndex::open(&temp.path().join("nested/index.sqlite")).unwrap();

        assert!(!index.collection_exists("math_qa").await.unwrap());
        assert!(index.collection_info("math_qa").await.unwrap().is_none());

        index.recreate_collection(&spec(Distance::Cosine)).await.unwrap();
        index
            .upsert("math_qa", &[point(0, vec![1.0, 0.0], "q0")])
            .await
            .unwrap();

        // Recreate empties the collection
        index.recreate_collection(&spec(Distance::Cosine)).await.unwrap();
        let info = index.collection_info("math_qa").await.unwrap().unwrap();
        assert_eq!(info.points_count, 0);
        assert_eq!(info.dimensions, 2);
        assert_eq!(info.distance, Distance::Cosine);
    }

    #[tokio::test]
    async fn test_cosine_search_best_first_with_payload() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection(&spec(Distance::Cosine)).await.unwrap();
        index
            .upsert(
                "math_qa",
                &[
                    point(0, vec![0.0, 1.0], "far"),
                    point(1, vec![1.0, 0.1], "near"),
                    point(2, vec![1.0, 1.0], "middle"),
                ],
            )
            .await
            .unwrap();

        let hits = index.search("math_qa", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, PointId::Num(1));
        assert_eq!(hits[1].id, PointId::Num(2));
        assert!(hits[0].score.unwrap() > hits[1].score.unwrap());
        assert_eq!(hits[0].payload["source_question"], "near");
    }

    #[tokio::test]
    async fn test_euclid_search_lowest_distance_first() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection(&spec(Distance::Euclid)).await.unwrap();
        index
            .upsert(
                "math_qa",
                &[point(0, vec![5.0, 5.0], "far"), point(1, vec![0.1, 0.0], "near")],
            )
            .await
            .unwrap();

        let hits = index.search("math_qa", &[0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits[0].id, PointId::Num(1));
        assert!(hits[0].score.unwrap() < hits[1].score.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection(&spec(Distance::Cosine)).await.unwrap();
        index
            .upsert("math_qa", &[point(7, vec![1.0, 0.0], "old")])
            .await
            .unwrap();
        index
            .upsert("math_qa", &[point(7, vec![1.0, 0.0], "new")])
            .await
            .unwrap();

        let info = index.collection_info("math_qa").await.unwrap().unwrap();
        assert_eq!(info.points_count, 1);
        let hits = index.search("math_qa", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].payload["source_question"], "new");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection(&spec(Distance::Cosine)).await.unwrap();

        let err = index
            .upsert("math_qa", &[point(0, vec![1.0, 0.0, 0.0], "q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = index.search("math_qa", &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_collection_is_index_error() {
        let index = SqliteIndex::open_in_memory().unwrap();
        let err = index
            .upsert("math_qa", &[point(0, vec![1.0, 0.0], "q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Index(_)));
        assert!(index.search("math_qa", &[1.0, 0.0], 1).await.is_err());
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }
}

//! Vector index abstraction.
//!
//! Two backends implement [`VectorIndex`]: Qdrant over its REST API and a
//! local SQLite file with brute-force scoring. Both hold one collection per
//! knowledge base, rebuilt from scratch on every ingestion.

pub mod qdrant;
pub mod sqlite;

pub use qdrant::QdrantIndex;
pub use sqlite::SqliteIndex;

use crate::types::{IndexedPoint, SearchHit};
use async_trait::async_trait;
use mathtutor_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Metric a collection is built with.
///
/// Cosine and dot report similarities (higher is closer). Euclid and
/// manhattan report distances (lower is closer). Relevance filtering must
/// know which, so the direction lives here rather than at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
    Manhattan,
}

impl Distance {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclid" | "euclidean" => Ok(Self::Euclid),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(AppError::Config(format!("Unknown distance: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dot => "dot",
            Self::Euclid => "euclid",
            Self::Manhattan => "manhattan",
        }
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, Self::Cosine | Self::Dot)
    }

    /// Whether a score passes the relevance threshold under this metric.
    pub fn is_relevant(&self, score: f32, threshold: f32) -> bool {
        if self.higher_is_better() {
            score >= threshold
        } else {
            score <= threshold
        }
    }

    /// Score two vectors of equal length.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Self::Euclid => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            Self::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    /// Order two scores best-first.
    pub fn compare(&self, a: f32, b: f32) -> std::cmp::Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
        if self.higher_is_better() {
            ord.reverse()
        } else {
            ord
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Shape of a collection: name, vector dimension D and metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimensions: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            name: config.index.collection.clone(),
            dimensions: config.embedding.dimensions,
            distance: Distance::parse(&config.index.distance)?,
        })
    }

    /// Check a live collection against this spec.
    pub fn check_matches(&self, info: &CollectionInfo) -> AppResult<()> {
        if info.dimensions != self.dimensions {
            return Err(AppError::Config(format!(
                "Collection '{}' stores {}-dimensional vectors but the embedding model produces {}",
                self.name, info.dimensions, self.dimensions
            )));
        }
        if info.distance != self.distance {
            return Err(AppError::Config(format!(
                "Collection '{}' uses {} distance but configuration expects {}",
                self.name, info.distance, self.distance
            )));
        }
        Ok(())
    }
}

/// What an index reports about an existing collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimensions: usize,
    pub distance: Distance,
    pub points_count: u64,
}

/// A vector store holding named collections.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name (e.g., "qdrant", "sqlite")
    fn backend_name(&self) -> &str;

    async fn collection_exists(&self, name: &str) -> AppResult<bool>;

    async fn delete_collection(&self, name: &str) -> AppResult<()>;

    async fn create_collection(&self, spec: &CollectionSpec) -> AppResult<()>;

    /// Insert or replace points by id.
    async fn upsert(&self, collection: &str, points: &[IndexedPoint]) -> AppResult<()>;

    /// Nearest neighbours, best first, with payloads.
    async fn search(&self, collection: &str, vector: &[f32], limit: usize)
        -> AppResult<Vec<SearchHit>>;

    /// `None` when the collection does not exist.
    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>>;

    /// Drop the collection if present and create it empty.
    async fn recreate_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        if self.collection_exists(&spec.name).await? {
            tracing::info!("Deleting existing collection '{}'", spec.name);
            self.delete_collection(&spec.name).await?;
        }
        self.create_collection(spec).await?;
        tracing::info!(
            "Created collection '{}' ({} dims, {})",
            spec.name,
            spec.dimensions,
            spec.distance
        );
        Ok(())
    }
}

/// Create the configured index backend.
pub fn create_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    match config.index.backend.to_lowercase().as_str() {
        "qdrant" => {
            let index = QdrantIndex::new(
                &config.index.url,
                config.index_api_key(),
                Duration::from_secs(config.index.timeout_secs),
            )?;
            Ok(Arc::new(index))
        }
        "sqlite" => Ok(Arc::new(SqliteIndex::open(&config.sqlite_index_path())?)),
        other => Err(AppError::Config(format!(
            "Unknown index backend: '{}'. Supported backends: qdrant, sqlite",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_parse() {
        assert_eq!(Distance::parse("Cosine").unwrap(), Distance::Cosine);
        assert_eq!(Distance::parse("euclidean").unwrap(), Distance::Euclid);
        assert!(matches!(Distance::parse("hamming"), Err(AppError::Config(_))));
    }

    #[test]
    fn test_relevance_direction_follows_metric() {
        assert!(Distance::Cosine.is_relevant(0.6, 0.6));
        assert!(!Distance::Cosine.is_relevant(0.59, 0.6));
        assert!(Distance::Dot.is_relevant(2.0, 0.6));

        assert!(Distance::Euclid.is_relevant(0.2, 0.6));
        assert!(!Distance::Euclid.is_relevant(0.9, 0.6));
        assert!(Distance::Manhattan.is_relevant(0.6, 0.6));
    }

    #[test]
    fn test_scores() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!((Distance::Cosine.score(&a, &a) - 1.0).abs() < 1e-6);
        assert!(Distance::Cosine.score(&a, &b).abs() < 1e-6);
        assert!((Distance::Euclid.score(&a, &b) - 2f32.sqrt()).abs() < 1e-6);
        assert!((Distance::Manhattan.score(&a, &b) - 2.0).abs() < 1e-6);
        assert_eq!(Distance::Cosine.score(&a, &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_compare_orders_best_first() {
        let mut sims = vec![0.1, 0.9, 0.5];
        sims.sort_by(|a, b| Distance::Cosine.compare(*a, *b));
        assert_eq!(sims, vec![0.9, 0.5, 0.1]);

        let mut dists = vec![0.1, 0.9, 0.5];
        dists.sort_by(|a, b| Distance::Euclid.compare(*a, *b));
        assert_eq!(dists, vec![0.1, 0.5, 0.9]);
    }

    #[test]
    fn test_spec_check_matches() {
        let spec = CollectionSpec {
            name: "math_qa".to_string(),
            dimensions: 384,
            distance: Distance::Cosine,
        };
        let mut info = CollectionInfo {
            name: "math_qa".to_string(),
            dimensions: 384,
            distance: Distance::Cosine,
            points_count: 10,
        };
        assert!(spec.check_matches(&info).is_ok());

        info.distance = Distance::Euclid;
        assert!(matches!(spec.check_matches(&info), Err(AppError::Config(_))));

        info.distance = Distance::Cosine;
        info.dimensions = 768;
        let err = spec.check_matches(&info).unwrap_err();
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn test_spec_from_default_config() {
        let spec = CollectionSpec::from_config(&AppConfig::default()).unwrap();
        assert_eq!(spec.name, "math_qa");
        assert_eq!(spec.dimensions, 384);
        assert_eq!(spec.distance, Distance::Cosine);
    }
}

//! Qdrant vector index over the REST API.

use super::{CollectionInfo, CollectionSpec, Distance, VectorIndex};
use crate::types::{IndexedPoint, PointId, PointPayload, SearchHit};
use async_trait::async_trait;
use mathtutor_core::{AppError, AppResult};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Debug, Serialize, Deserialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Debug, Serialize)]
struct UpsertPoints<'a> {
    points: Vec<QdrantPoint<'a>>,
}

#[derive(Debug, Serialize)]
struct QdrantPoint<'a> {
    id: u64,
    vector: &'a [f32],
    payload: &'a PointPayload,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: PointId,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CollectionResult {
    #[serde(default)]
    points_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    status: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    error: String,
}

fn qdrant_distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
        Distance::Dot => "Dot",
        Distance::Euclid => "Euclid",
        Distance::Manhattan => "Manhattan",
    }
}

/// Qdrant client for one server.
pub struct QdrantIndex {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl QdrantIndex {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Index(format!("Failed to create HTTP client for Qdrant: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> AppResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.status.error)
            .unwrap_or(body);
        Err(AppError::Index(format!(
            "Failed to {} ({}): {}",
            action, status, message
        )))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response, action: &str) -> AppResult<T> {
        let body: QdrantResponse<T> = response.json().await.map_err(|e| {
            AppError::Index(format!("Failed to parse Qdrant response to {}: {}", action, e))
        })?;
        Ok(body.result)
    }
}

fn to_search_hit(point: ScoredPoint) -> SearchHit {
    SearchHit {
        id: point.id,
        score: point.score,
        payload: point.payload.unwrap_or_default(),
    }
}

fn to_collection_info(name: &str, result: CollectionResult) -> AppResult<CollectionInfo> {
    let vectors = result.config.params.vectors;
    let distance = Distance::parse(&vectors.distance)?;
    Ok(CollectionInfo {
        name: name.to_string(),
        dimensions: vectors.size,
        distance,
        points_count: result.points_count.unwrap_or(0),
    })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn backend_name(&self) -> &str {
        "qdrant"
    }

    async fn collection_exists(&self, name: &str) -> AppResult<bool> {
        let action = "check collection";
        let response = self
            .send(
                self.request(Method::GET, &format!("/collections/{}/exists", name)),
                action,
            )
            .await?;
        let result: ExistsResult = Self::parse(response, action).await?;
        Ok(result.exists)
    }

    async fn delete_collection(&self, name: &str) -> AppResult<()> {
        self.send(
            self.request(Method::DELETE, &format!("/collections/{}", name)),
            "delete collection",
        )
        .await?;
        Ok(())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        let body = CreateCollection {
            vectors: VectorParams {
                size: spec.dimensions,
                distance: qdrant_distance_name(spec.distance).to_string(),
            },
        };
        self.send(
            self.request(Method::PUT, &format!("/collections/{}", spec.name))
                .json(&body),
            "create collection",
        )
        .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[IndexedPoint]) -> AppResult<()> {
        let body = UpsertPoints {
            points: points
                .iter()
                .map(|p| QdrantPoint {
                    id: p.id,
                    vector: &p.vector,
                    payload: &p.payload,
                })
                .collect(),
        };
        self.send(
            self.request(
                Method::PUT,
                &format!("/collections/{}/points?wait=true", collection),
            )
            .json(&body),
            "upsert points",
        )
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let action = "search points";
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let response = self
            .send(
                self.request(
                    Method::POST,
                    &format!("/collections/{}/points/search", collection),
                )
                .json(&body),
                action,
            )
            .await?;
        let points: Vec<ScoredPoint> = Self::parse(response, action).await?;
        tracing::debug!("Qdrant returned {} hits", points.len());
        Ok(points.into_iter().map(to_search_hit).collect())
    }

    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        let action = "read collection";
        let builder = self.request(Method::GET, &format!("/collections/{}", name));
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Failed to {}: {}", action, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Index(format!(
                "Failed to {} ({})",
                action,
                response.status()
            )));
        }

        let result: CollectionResult = Self::parse(response, action).await?;
        to_collection_info(name, result).map(Some)
    }
}

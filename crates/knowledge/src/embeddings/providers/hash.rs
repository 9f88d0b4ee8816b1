//! Offline embedding provider based on hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use mathtutor_core::AppResult;
use std::collections::HashMap;

const MODEL_NAME: &str = "trigram-hash-v1";

/// Deterministic embedder that needs no network or model files.
///
/// Each lowercase token contributes its character trigrams and the whole
/// token to hashed buckets, then the vector is normalized to unit length.
/// Texts sharing notation ("2+2", "x^2") land close together, which is
/// enough for offline deployments and smoke tests but is not semantic.
#[derive(Debug)]
pub struct HashProvider {
    dimensions: usize,
}

impl HashProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();

        let mut token_freq: HashMap<&str, u32> = HashMap::new();
        for token in lower.split_whitespace() {
            *token_freq.entry(token).or_insert(0) += 1;
        }

        for (token, freq) in &token_freq {
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let idx = bucket(window.iter().copied(), 37, self.dimensions);
                embedding[idx] += (*freq as f32).sqrt();
            }

            let idx = bucket(token.chars(), 31, self.dimensions);
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn bucket(chars: impl Iterator<Item = char>, multiplier: u64, dimensions: usize) -> usize {
    let hash = chars.fold(0u64, |acc, c| {
        acc.wrapping_mul(multiplier).wrapping_add(c as u64)
    });
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashProvider {
    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

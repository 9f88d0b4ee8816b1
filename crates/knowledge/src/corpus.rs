//! Corpus loading.
//!
//! A corpus is a single JSON file or a directory of them. Each file holds an
//! array of `{"question": ..., "answer": ...}` records.

use crate::types::KnowledgeItem;
use mathtutor_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Items loaded from a corpus location.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub items: Vec<KnowledgeItem>,
    pub files_loaded: usize,
    pub files_skipped: usize,
}

/// Load every corpus file at `location`.
///
/// A file that fails to parse is logged and skipped. Only a missing
/// location is an error.
pub fn load_corpus(location: &Path) -> AppResult<Corpus> {
    if !location.exists() {
        return Err(AppError::CorpusNotFound(location.to_path_buf()));
    }

    let files = corpus_files(location)?;
    if files.is_empty() {
        tracing::warn!("No corpus files found in {:?}", location);
    }

    let mut corpus = Corpus::default();
    for path in files {
        match parse_corpus_file(&path) {
            Ok(items) => {
                tracing::info!("Loaded {} items from {:?}", items.len(), path);
                corpus.items.extend(items);
                corpus.files_loaded += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping corpus file: {}", e);
                corpus.files_skipped += 1;
            }
        }
    }

    Ok(corpus)
}

/// JSON files directly inside `location`, in file-name order.
fn corpus_files(location: &Path) -> AppResult<Vec<PathBuf>> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(location)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            AppError::Io(std::io::Error::other(format!(
                "Failed to read corpus directory {:?}: {}",
                location, e
            )))
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some("json")
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Parse one corpus file. Fields are trimmed; missing ones become empty.
pub fn parse_corpus_file(path: &Path) -> AppResult<Vec<KnowledgeItem>> {
    let parse_error = |message: String| AppError::CorpusParse {
        path: path.to_path_buf(),
        message,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
    let records: Vec<KnowledgeItem> =
        serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?;

    Ok(records
        .into_iter()
        .map(|item| KnowledgeItem::new(item.question, item.answer))
        .collect())
}

//! Local corpus index over the caption cache.
//!
//! The caption step writes `image_index.json` as `[{filename, description}]`.
//! [`CorpusIndex`] scores descriptions against free-text queries with TF-IDF
//! cosine similarity, so scores stay in [0, 1] and results are fully
//! deterministic (ties break by filename).
//!
//! [`RetrievalContext`] owns the index handle explicitly: load lazily with
//! [`RetrievalContext::handle`], drop it with [`RetrievalContext::reset`],
//! reload with [`RetrievalContext::rebuild`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{BrollError, Candidate};
use crate::ports::{PortResult, RetrievalPort};

/// Descriptions longer than this are truncated when indexed.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "in", "into", "is", "it", "its", "of", "on", "or", "she", "so", "that", "the",
    "their", "them", "then", "there", "they", "this", "to", "was", "we", "were", "with", "you",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("static token pattern"))
}

fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn term_counts(tokens: &[String]) -> HashMap<&str, f64> {
    let mut counts = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0.0) += 1.0;
    }
    counts
}

/// One entry of the caption cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub description: String,
}

impl CaptionRecord {
    pub fn new(filename: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug)]
struct IndexedImage {
    filename: String,
    description: String,
    weights: HashMap<String, f64>,
    norm: f64,
}

/// In-memory TF-IDF index over image descriptions.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    images: Vec<IndexedImage>,
    idf: HashMap<String, f64>,
}

impl CorpusIndex {
    /// Index caption records. Records without a filename or description are
    /// skipped; for duplicate filenames the first record wins.
    pub fn build(records: impl IntoIterator<Item = CaptionRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut docs: Vec<(String, String, Vec<String>)> = Vec::new();

        for record in records {
            let filename = record.filename.trim().to_string();
            let description: String = record
                .description
                .trim()
                .chars()
                .take(MAX_DESCRIPTION_CHARS)
                .collect();
            if filename.is_empty() || description.is_empty() {
                debug!(filename = %filename, "skipping caption record without content");
                continue;
            }
            if !seen.insert(filename.clone()) {
                warn!(filename = %filename, "duplicate caption record ignored");
                continue;
            }
            let tokens = tokenize(&description);
            docs.push((filename, description, tokens));
        }

        let n = docs.len() as f64;
        let mut df: HashMap<String, f64> = HashMap::new();
        for (_, _, tokens) in &docs {
            let unique: HashSet<&String> = tokens.iter().collect();
            for t in unique {
                *df.entry(t.clone()).or_insert(0.0) += 1.0;
            }
        }
        let idf: HashMap<String, f64> = df
            .into_iter()
            .map(|(term, count)| (term, ((n + 1.0) / (count + 1.0)).ln() + 1.0))
            .collect();

        let images = docs
            .into_iter()
            .map(|(filename, description, tokens)| {
                let weights: HashMap<String, f64> = term_counts(&tokens)
                    .into_iter()
                    .map(|(term, tf)| (term.to_string(), tf * idf[term]))
                    .collect();
                let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
                IndexedImage {
                    filename,
                    description,
                    weights,
                    norm,
                }
            })
            .collect();

        Self { images, idf }
    }

    /// Load and index a caption cache file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BrollError::Corpus(format!("cannot read image index {}: {e}", path.display()))
        })?;
        let records: Vec<CaptionRecord> = serde_json::from_str(&raw).map_err(|e| {
            BrollError::Corpus(format!("malformed image index {}: {e}", path.display()))
        })?;
        let index = Self::build(records);
        info!(path = %path.display(), images = index.len(), "corpus index loaded");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Top-`k` images for `text`, best first. Images sharing no indexed term
    /// with the query are not returned.
    pub fn search(&self, text: &str, k: usize) -> Vec<Candidate> {
        let tokens = tokenize(text);
        let query: HashMap<&str, f64> = term_counts(&tokens)
            .into_iter()
            .filter_map(|(term, tf)| self.idf.get(term).map(|idf| (term, tf * idf)))
            .collect();
        let query_norm = query.values().map(|w| w * w).sum::<f64>().sqrt();
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<Candidate> = self
            .images
            .iter()
            .filter_map(|img| {
                let dot: f64 = query
                    .iter()
                    .filter_map(|(term, qw)| img.weights.get(*term).map(|dw| qw * dw))
                    .sum();
                (dot > 0.0).then(|| {
                    Candidate::new(
                        img.filename.clone(),
                        img.description.clone(),
                        (dot / (query_norm * img.norm)).min(1.0),
                    )
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        hits.truncate(k);
        hits
    }
}

#[async_trait]
impl RetrievalPort for CorpusIndex {
    async fn query(&self, text: &str, k: usize) -> PortResult<Vec<Candidate>> {
        Ok(self.search(text, k))
    }
}

/// Explicit owner of the corpus index handle.
#[derive(Debug)]
pub struct RetrievalContext {
    index_path: PathBuf,
    index: Option<Arc<CorpusIndex>>,
}

impl RetrievalContext {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            index: None,
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// The loaded index, loading it on first use.
    pub fn handle(&mut self) -> crate::Result<Arc<CorpusIndex>> {
        if let Some(index) = &self.index {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(CorpusIndex::load(&self.index_path)?);
        self.index = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Drop this context's handle. Outstanding clones stay valid until dropped.
    pub fn reset(&mut self) {
        if self.index.take().is_some() {
            info!(path = %self.index_path.display(), "corpus index released");
        }
    }

    /// Reset, then load the index again from disk.
    pub fn rebuild(&mut self) -> crate::Result<Arc<CorpusIndex>> {
        self.reset();
        self.handle()
    }
}

//! In-memory vector index
//!
//! Brute-force cosine search over both spaces. Used in tests and as the
//! default backend for small archives; large deployments swap in a real
//! backend behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::{CoreError, CoreResult};

use super::{IndexHit, IndexSpace, VectorIndex};

/// Brute-force in-memory index.
pub struct MemoryVectorIndex {
    spaces: RwLock<HashMap<IndexSpace, HashMap<String, Vec<f32>>>>,
    /// When set, every call fails with `IndexUnavailable`. Test hook for
    /// outage behavior.
    poisoned: std::sync::atomic::AtomicBool,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            spaces: RwLock::new(HashMap::new()),
            poisoned: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Makes every subsequent call fail, simulating a backend outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.poisoned
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }

    fn check_available(&self) -> CoreResult<()> {
        if self.poisoned.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CoreError::IndexUnavailable(
                "in-memory index marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(
        &self,
        space: IndexSpace,
        video_id: &str,
        embedding: Vec<f32>,
    ) -> CoreResult<()> {
        self.check_available()?;
        if embedding.is_empty() {
            return Err(CoreError::ValidationError(
                "embedding must not be empty".to_string(),
            ));
        }
        let mut spaces = self.spaces.write().await;
        spaces
            .entry(space)
            .or_default()
            .insert(video_id.to_string(), embedding);
        Ok(())
    }

    async fn search(
        &self,
        space: IndexSpace,
        embedding: &[f32],
        limit: usize,
    ) -> CoreResult<Vec<IndexHit>> {
        self.check_available()?;
        let spaces = self.spaces.read().await;
        let Some(entries) = spaces.get(&space) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<IndexHit> = entries
            .iter()
            .map(|(video_id, stored)| IndexHit {
                video_id: video_id.clone(),
                score: cosine_similarity(embedding, stored),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn remove(&self, video_id: &str) -> CoreResult<()> {
        self.check_available()?;
        let mut spaces = self.spaces.write().await;
        for entries in spaces.values_mut() {
            entries.remove(video_id);
        }
        Ok(())
    }

    async fn health_check(&self) -> CoreResult<()> {
        self.check_available()
    }
}

/// Cosine similarity clamped to `[0.0, 1.0]`.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_search() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(IndexSpace::Description, "a", vec![1.0, 0.0])
            .await
            .unwrap();
        index
            .upsert(IndexSpace::Description, "b", vec![0.0, 1.0])
            .await
            .unwrap();

        let hits = index
            .search(IndexSpace::Description, &[1.0, 0.1], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].video_id, "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_spaces_are_isolated() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(IndexSpace::Description, "a", vec![1.0, 0.0])
            .await
            .unwrap();

        let hits = index
            .search(IndexSpace::Transcript, &[1.0, 0.0], 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let index = MemoryVectorIndex::new();
        for i in 0..5 {
            index
                .upsert(IndexSpace::Transcript, &format!("v{i}"), vec![1.0, i as f32])
                .await
                .unwrap();
        }

        let hits = index
            .search(IndexSpace::Transcript, &[1.0, 0.0], 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_remove_clears_both_spaces() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(IndexSpace::Description, "a", vec![1.0])
            .await
            .unwrap();
        index
            .upsert(IndexSpace::Transcript, "a", vec![1.0])
            .await
            .unwrap();

        index.remove("a").await.unwrap();

        for space in [IndexSpace::Description, IndexSpace::Transcript] {
            let hits = index.search(space, &[1.0], 10).await.unwrap();
            assert!(hits.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unavailable_index_errors() {
        let index = MemoryVectorIndex::new();
        index.set_unavailable(true);

        let err = index
            .search(IndexSpace::Description, &[1.0], 10)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::IndexUnavailable(_)));
        assert!(index.health_check().await.is_err());
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        // opposite vectors clamp to zero
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}

//! Embedding capability used by [`EmbeddingScorer`](crate::scorer::EmbeddingScorer).

use async_trait::async_trait;

/// Turns text into a dense vector for similarity scoring.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`, returning a dense vector.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    /// Stable provider identifier.
    fn name(&self) -> &'static str;
    /// Model identifier reported in metrics/labels.
    fn model_id(&self) -> String;
}

/// Deterministic embedder for tests: always returns the same fixed vector.
#[derive(Clone)]
pub struct FakeEmbedder {
    model: String,
    vector: Vec<f32>,
}

impl FakeEmbedder {
    /// An embedder that returns `vector` for any input text.
    pub fn new(model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            vector,
        }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    fn name(&self) -> &'static str {
        "fake"
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

use ccfarm_datastore::{ArticleScore, CachedScore, MemoryDataStore, ScoreStore};

/// Score cache whose eviction always fails
#[derive(Clone, Default)]
pub struct FailingCleanupStore {
    pub inner: MemoryDataStore,
}

impl ScoreStore for FailingCleanupStore {
    async fn get_score(&self, url: &str) -> anyhow::Result<Option<ArticleScore>> {
        self.inner.get_score(url).await
    }

    async fn save_score(&self, url: &str, title: &str, score: &ArticleScore) -> anyhow::Result<()> {
        self.inner.save_score(url, title, score).await
    }

    async fn list_scores(&self, limit: usize) -> anyhow::Result<Vec<CachedScore>> {
        self.inner.list_scores(limit).await
    }

    async fn cleanup_expired(&self) -> anyhow::Result<u64> {
        anyhow::bail!("connection reset")
    }
}

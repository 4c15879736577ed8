use std::{collections::HashMap, collections::HashSet, fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    datastore::{cache_ttl, BriefStore, ScoreStore, ScriptStore, DEFAULT_CACHE_DAYS},
    ArticleScore, Brief, CachedScore, NewScript, Script,
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default)]
struct MemoryState {
    scores: HashMap<String, CachedScore>,
    briefs: HashMap<String, Brief>,
    scripts: Vec<Script>,
    next_script_id: i64,
}

/// In-process store with the same semantics as [`crate::PgDataStore`].
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct MemoryDataStore {
    state: Arc<RwLock<MemoryState>>,
    cache_ttl: Duration,
    clock: Clock,
}

impl fmt::Debug for MemoryDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataStore")
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                next_script_id: 1,
                ..Default::default()
            })),
            cache_ttl: cache_ttl(DEFAULT_CACHE_DAYS),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_cache_days(mut self, days: i64) -> Self {
        self.cache_ttl = cache_ttl(days);
        self
    }

    /// Replaces the wall clock, used to exercise expiry
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn cutoff(&self) -> DateTime<Utc> {
        self.now() - self.cache_ttl
    }
}

impl ScoreStore for MemoryDataStore {
    async fn get_score(&self, url: &str) -> anyhow::Result<Option<ArticleScore>> {
        let cutoff = self.cutoff();
        let state = self.state.read().await;

        Ok(state
            .scores
            .get(url)
            .filter(|cached| cached.cached_at > cutoff)
            .map(|cached| cached.score.clone()))
    }

    async fn save_score(
        &self,
        url: &str,
        title: &str,
        score: &ArticleScore,
    ) -> anyhow::Result<()> {
        let cached = CachedScore {
            url: url.to_string(),
            title: title.to_string(),
            score: score.clone(),
            cached_at: self.now(),
        };
        self.state.write().await.scores.insert(url.to_string(), cached);
        Ok(())
    }

    async fn list_scores(&self, limit: usize) -> anyhow::Result<Vec<CachedScore>> {
        let cutoff = self.cutoff();
        let state = self.state.read().await;

        Ok(state
            .scores
            .values()
            .filter(|cached| cached.cached_at > cutoff)
            .sorted_by(|a, b| {
                b.score
                    .score
                    .cmp(&a.score.score)
                    .then_with(|| b.cached_at.cmp(&a.cached_at))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn cleanup_expired(&self) -> anyhow::Result<u64> {
        let cutoff = self.cutoff();
        let mut state = self.state.write().await;

        let before = state.scores.len();
        state.scores.retain(|_, cached| cached.cached_at >= cutoff);
        Ok((before - state.scores.len()) as u64)
    }
}

impl BriefStore for MemoryDataStore {
    async fn store_brief(
        &self,
        article_id: &str,
        model_output: &Value,
        metadata: Option<&Value>,
    ) -> anyhow::Result<()> {
        let brief = Brief {
            article_id: article_id.to_string(),
            model_output: model_output.clone(),
            metadata: metadata.cloned(),
            created_at: self.now(),
        };
        self.state
            .write()
            .await
            .briefs
            .insert(article_id.to_string(), brief);
        Ok(())
    }

    async fn get_brief(&self, article_id: &str) -> anyhow::Result<Option<Brief>> {
        Ok(self.state.read().await.briefs.get(article_id).cloned())
    }

    async fn is_article_briefed(&self, article_id: &str) -> anyhow::Result<bool> {
        Ok(self.state.read().await.briefs.contains_key(article_id))
    }

    async fn list_briefs(&self, limit: usize) -> anyhow::Result<Vec<Brief>> {
        let state = self.state.read().await;

        Ok(state
            .briefs
            .values()
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_briefed_article_ids(
        &self,
        article_ids: &[&str],
    ) -> anyhow::Result<HashSet<String>> {
        let state = self.state.read().await;

        Ok(article_ids
            .iter()
            .filter(|id| state.briefs.contains_key(**id))
            .map(|id| id.to_string())
            .collect())
    }
}

impl ScriptStore for MemoryDataStore {
    async fn store_script(&self, script: &NewScript) -> anyhow::Result<i64> {
        let created_at = self.now();
        let mut state = self.state.write().await;

        let id = state.next_script_id;
        state.next_script_id += 1;
        state.scripts.push(Script {
            id,
            title: script.title.clone(),
            script_data: script.script_data.clone(),
            source_articles: script.source_articles.clone(),
            created_at,
        });

        Ok(id)
    }

    async fn get_script(&self, id: i64) -> anyhow::Result<Option<Script>> {
        let state = self.state.read().await;
        Ok(state.scripts.iter().find(|s| s.id == id).cloned())
    }

    async fn list_scripts(&self, limit: usize) -> anyhow::Result<Vec<Script>> {
        let state = self.state.read().await;

        // newest first; ids break ties between scripts stored in the same instant
        Ok(state
            .scripts
            .iter()
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_scripts_by_source(&self, article_id: &str) -> anyhow::Result<Vec<Script>> {
        let state = self.state.read().await;

        Ok(state
            .scripts
            .iter()
            .filter(|s| s.source_articles.iter().any(|a| a == article_id))
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            .cloned()
            .collect())
    }

    async fn get_scripted_article_ids(
        &self,
        article_ids: &[&str],
    ) -> anyhow::Result<HashSet<String>> {
        let state = self.state.read().await;

        Ok(article_ids
            .iter()
            .filter(|id| {
                state
                    .scripts
                    .iter()
                    .any(|s| s.source_articles.iter().any(|a| a == **id))
            })
            .map(|id| id.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn score(value: i64) -> ArticleScore {
        ArticleScore::new(value, format!("scored {value}")).unwrap()
    }

    /// Store whose clock can be moved forward by the test
    fn store_with_clock() -> (MemoryDataStore, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()));
        let clock = now.clone();
        let store = MemoryDataStore::new().with_clock(move || *clock.lock().unwrap());
        (store, now)
    }

    #[tokio::test]
    async fn test_score_round_trip_and_upsert() {
        let store = MemoryDataStore::new();

        store.save_score("https://a", "A", &score(3)).await.unwrap();
        store.save_score("https://a", "A v2", &score(8)).await.unwrap();

        assert_eq!(store.get_score("https://a").await.unwrap(), Some(score(8)));
        let listed = store.list_scores(10).await.unwrap();
        assert_eq!(listed.len(), 1, "one score per url");
        assert_eq!(listed[0].title, "A v2");
    }

    #[tokio::test]
    async fn test_expired_scores_are_invisible_and_cleaned() {
        let (store, now) = store_with_clock();

        store.save_score("https://old", "Old", &score(9)).await.unwrap();
        *now.lock().unwrap() += Duration::days(5);
        store.save_score("https://new", "New", &score(2)).await.unwrap();
        *now.lock().unwrap() += Duration::days(3);

        assert_eq!(store.get_score("https://old").await.unwrap(), None);
        assert_eq!(store.get_score("https://new").await.unwrap(), Some(score(2)));

        let listed = store.list_scores(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].url, "https://new");

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_scores_orders_best_first_and_limits() {
        let store = MemoryDataStore::new();
        for (i, value) in [4, 9, 1, 7].into_iter().enumerate() {
            store
                .save_score(&format!("https://{i}"), "t", &score(value))
                .await
                .unwrap();
        }

        let listed = store.list_scores(3).await.unwrap();
        let values: Vec<u8> = listed.iter().map(|c| c.score.score).collect();
        assert_eq!(values, vec![9, 7, 4]);
    }

    #[tokio::test]
    async fn test_briefed_and_scripted_ids() {
        let store = MemoryDataStore::new();

        store
            .store_brief("https://a", &json!({"summary": "s"}), None)
            .await
            .unwrap();
        assert!(store.is_article_briefed("https://a").await.unwrap());
        assert!(!store.is_article_briefed("https://b").await.unwrap());

        let briefed = store
            .get_briefed_article_ids(&["https://a", "https://b"])
            .await
            .unwrap();
        assert_eq!(briefed, HashSet::from(["https://a".to_string()]));

        let id = store
            .store_script(&NewScript {
                title: "Script".into(),
                script_data: json!({}),
                source_articles: vec!["https://b".into(), "https://c".into()],
            })
            .await
            .unwrap();
        assert_eq!(store.get_script(id).await.unwrap().unwrap().title, "Script");

        let scripted = store
            .get_scripted_article_ids(&["https://a", "https://b", "https://c"])
            .await
            .unwrap();
        assert_eq!(scripted.len(), 2);
        assert!(!scripted.contains("https://a"));
        assert_eq!(store.get_scripts_by_source("https://c").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_equal_scores_list_most_recent_first() {
        let (store, now) = store_with_clock();

        store.save_score("https://first", "First", &score(6)).await.unwrap();
        *now.lock().unwrap() += Duration::hours(1);
        store.save_score("https://second", "Second", &score(6)).await.unwrap();
        *now.lock().unwrap() += Duration::hours(1);
        store.save_score("https://best", "Best", &score(8)).await.unwrap();

        let urls = store
            .list_scores(10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.url)
            .collect::<Vec<_>>();
        assert_eq!(urls, ["https://best", "https://second", "https://first"]);
    }

    #[tokio::test]
    async fn test_list_briefs_newest_first() {
        let (store, now) = store_with_clock();

        for id in ["https://a", "https://b", "https://c"] {
            store
                .store_brief(id, &json!({"summary": id}), Some(&json!({"title": id})))
                .await
                .unwrap();
            *now.lock().unwrap() += Duration::minutes(5);
        }

        let briefs = store.list_briefs(2).await.unwrap();
        let ids = briefs.iter().map(|b| b.article_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["https://c", "https://b"]);
        assert_eq!(briefs[0].metadata, Some(json!({"title": "https://c"})));

        // re-briefing replaces the old brief and makes it the newest
        store
            .store_brief("https://a", &json!({"summary": "again"}), None)
            .await
            .unwrap();
        let briefs = store.list_briefs(10).await.unwrap();
        assert_eq!(briefs.len(), 3);
        assert_eq!(briefs[0].article_id, "https://a");
        assert_eq!(briefs[0].model_output, json!({"summary": "again"}));
    }

    #[tokio::test]
    async fn test_list_scripts_newest_first() {
        let (store, now) = store_with_clock();

        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            let id = store
                .store_script(&NewScript {
                    title: title.into(),
                    script_data: json!({"title": title}),
                    source_articles: vec![format!("https://{title}")],
                })
                .await
                .unwrap();
            ids.push(id);
        }
        *now.lock().unwrap() += Duration::minutes(1);
        let latest = store
            .store_script(&NewScript {
                title: "Four".into(),
                script_data: json!({}),
                source_articles: vec![],
            })
            .await
            .unwrap();

        let listed = store
            .list_scripts(3)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect::<Vec<_>>();
        assert_eq!(listed, [latest, ids[2], ids[1]]);
        assert!(store.list_scripts(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_days_are_clamped() {
        let (store, now) = store_with_clock();
        let store = store.with_cache_days(i64::MAX);

        store.save_score("https://a", "A", &score(5)).await.unwrap();
        *now.lock().unwrap() += Duration::days(365);
        assert_eq!(store.get_score("https://a").await.unwrap(), Some(score(5)));
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);

        let store = store.with_cache_days(-3);
        assert_eq!(store.get_score("https://a").await.unwrap(), None);
    }
}

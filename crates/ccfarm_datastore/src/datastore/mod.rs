use std::{collections::HashSet, future::Future};

use chrono::Duration;
use serde_json::Value;

use crate::{ArticleScore, Brief, CachedScore, NewScript, Script};

pub mod memory;
pub mod postgres;

/// Default time-to-live of cached scores
pub const DEFAULT_CACHE_DAYS: i64 = 7;
/// Longest accepted time-to-live, in days
pub const MAX_CACHE_DAYS: i64 = 3650;

/// Time-to-live of `days`, clamped to `0..=MAX_CACHE_DAYS`
pub(crate) fn cache_ttl(days: i64) -> Duration {
    Duration::days(days.clamp(0, MAX_CACHE_DAYS))
}

/// Url keyed cache of article scores with time-to-live eviction
pub trait ScoreStore {
    /// Returns the cached score for `url` unless it has expired
    fn get_score(
        &self,
        url: &str,
    ) -> impl Future<Output = anyhow::Result<Option<ArticleScore>>> + Send;

    /// Upserts the score for `url`, refreshing its cache timestamp
    fn save_score(
        &self,
        url: &str,
        title: &str,
        score: &ArticleScore,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Non-expired scores, best first
    fn list_scores(
        &self,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<CachedScore>>> + Send;

    /// Deletes expired rows and returns how many were removed
    fn cleanup_expired(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

pub trait BriefStore {
    fn store_brief(
        &self,
        article_id: &str,
        model_output: &Value,
        metadata: Option<&Value>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_brief(
        &self,
        article_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Brief>>> + Send;

    fn is_article_briefed(
        &self,
        article_id: &str,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Most recent briefs first
    fn list_briefs(&self, limit: usize)
        -> impl Future<Output = anyhow::Result<Vec<Brief>>> + Send;

    /// Subset of `article_ids` that already have a brief
    fn get_briefed_article_ids(
        &self,
        article_ids: &[&str],
    ) -> impl Future<Output = anyhow::Result<HashSet<String>>> + Send;
}

pub trait ScriptStore {
    /// Inserts a script and returns its id
    fn store_script(&self, script: &NewScript)
        -> impl Future<Output = anyhow::Result<i64>> + Send;

    fn get_script(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Script>>> + Send;

    /// Most recent scripts first
    fn list_scripts(
        &self,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<Script>>> + Send;

    fn get_scripts_by_source(
        &self,
        article_id: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Script>>> + Send;

    /// Subset of `article_ids` already used as a source by some script
    fn get_scripted_article_ids(
        &self,
        article_ids: &[&str],
    ) -> impl Future<Output = anyhow::Result<HashSet<String>>> + Send;
}

pub trait DataStore: ScoreStore + BriefStore + ScriptStore {}

impl<T: ScoreStore + BriefStore + ScriptStore> DataStore for T {}

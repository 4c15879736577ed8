use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{
    datastore::{cache_ttl, BriefStore, ScoreStore, ScriptStore, DEFAULT_CACHE_DAYS},
    ArticleScore, Brief, CachedScore, NewScript, Script,
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pub pool: PgPool,
    cache_ttl: Duration,
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    url: String,
    title: String,
    score: i16,
    reason: String,
    cached_at: DateTime<Utc>,
}

impl TryFrom<ScoreRow> for CachedScore {
    type Error = anyhow::Error;

    fn try_from(row: ScoreRow) -> Result<Self, Self::Error> {
        let score = ArticleScore::new(row.score.into(), row.reason)
            .with_context(|| format!("Corrupt score stored for {}", row.url))?;

        Ok(CachedScore {
            url: row.url,
            title: row.title,
            score,
            cached_at: row.cached_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BriefRow {
    article_id: String,
    model_output: Value,
    metadata: Option<Value>,
    created_at: DateTime<Utc>,
}

impl From<BriefRow> for Brief {
    fn from(row: BriefRow) -> Self {
        Brief {
            article_id: row.article_id,
            model_output: row.model_output,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScriptRow {
    id: i64,
    title: String,
    script_data: Value,
    source_articles: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<ScriptRow> for Script {
    fn from(row: ScriptRow) -> Self {
        Script {
            id: row.id,
            title: row.title,
            script_data: row.script_data,
            source_articles: row.source_articles,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ArticleId {
    article_id: String,
}

impl PgDataStore {
    /// Establish connection to database and run the embedded migrations
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgDataStore {
            pool,
            cache_ttl: cache_ttl(DEFAULT_CACHE_DAYS),
        })
    }

    pub fn with_cache_days(mut self, days: i64) -> Self {
        self.cache_ttl = cache_ttl(days);
        self
    }

    fn cutoff(&self) -> DateTime<Utc> {
        Utc::now() - self.cache_ttl
    }
}

impl ScoreStore for PgDataStore {
    async fn get_score(&self, url: &str) -> anyhow::Result<Option<ArticleScore>> {
        let row = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT url, title, score, reason, cached_at
            FROM article_scores
            WHERE url = $1 AND cached_at > $2
            "#,
        )
        .bind(url)
        .bind(self.cutoff())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, url, "Failed to fetch cached score"))
        .context("Failed to fetch cached score")?;

        row.map(CachedScore::try_from)
            .transpose()
            .map(|cached| cached.map(|c| c.score))
    }

    async fn save_score(&self, url: &str, title: &str, score: &ArticleScore) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO article_scores (url, title, score, reason, cached_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO UPDATE
            SET title = EXCLUDED.title,
                score = EXCLUDED.score,
                reason = EXCLUDED.reason,
                cached_at = EXCLUDED.cached_at
            "#,
        )
        .bind(url)
        .bind(title)
        .bind(i16::from(score.score))
        .bind(&score.reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, url, "Failed to cache score"))
        .context("Failed to cache score")?;

        Ok(())
    }

    async fn list_scores(&self, limit: usize) -> anyhow::Result<Vec<CachedScore>> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT url, title, score, reason, cached_at
            FROM article_scores
            WHERE cached_at > $1
            ORDER BY score DESC, cached_at DESC
            LIMIT $2
            "#,
        )
        .bind(self.cutoff())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to list cached scores"))
        .context("Failed to list cached scores")?;

        rows.into_iter().map(CachedScore::try_from).collect()
    }

    async fn cleanup_expired(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM article_scores WHERE cached_at < $1")
            .bind(self.cutoff())
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to clean up expired scores"))
            .context("Failed to clean up expired scores")?;

        Ok(result.rows_affected())
    }
}

impl BriefStore for PgDataStore {
    async fn store_brief(
        &self,
        article_id: &str,
        model_output: &Value,
        metadata: Option<&Value>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO article_briefs (article_id, model_output, metadata, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (article_id) DO UPDATE
            SET model_output = EXCLUDED.model_output,
                metadata = EXCLUDED.metadata,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(article_id)
        .bind(model_output)
        .bind(metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, article_id, "Failed to store brief"))
        .context("Failed to store brief")?;

        Ok(())
    }

    async fn get_brief(&self, article_id: &str) -> anyhow::Result<Option<Brief>> {
        let row = sqlx::query_as::<_, BriefRow>(
            "SELECT article_id, model_output, metadata, created_at FROM article_briefs WHERE article_id = $1",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch brief")?;

        Ok(row.map(Brief::from))
    }

    async fn is_article_briefed(&self, article_id: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM article_briefs WHERE article_id = $1)",
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check brief status")?;

        Ok(exists)
    }

    async fn list_briefs(&self, limit: usize) -> anyhow::Result<Vec<Brief>> {
        let rows = sqlx::query_as::<_, BriefRow>(
            r#"
            SELECT article_id, model_output, metadata, created_at
            FROM article_briefs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to list briefs"))
        .context("Failed to list briefs")?;

        Ok(rows.into_iter().map(Brief::from).collect())
    }

    async fn get_briefed_article_ids(
        &self,
        article_ids: &[&str],
    ) -> anyhow::Result<HashSet<String>> {
        let rows = sqlx::query_as::<_, ArticleId>(
            "SELECT article_id FROM article_briefs WHERE article_id = ANY($1)",
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch briefed article ids"))
        .context("Failed to fetch briefed article ids")?;

        Ok(rows.into_iter().map(|r| r.article_id).collect())
    }
}

impl ScriptStore for PgDataStore {
    async fn store_script(&self, script: &NewScript) -> anyhow::Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comedy_scripts (title, script_data, source_articles, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&script.title)
        .bind(&script.script_data)
        .bind(&script.source_articles)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(error = ?e, title = %script.title, "Failed to store script")
        })
        .context("Failed to store script")?;

        Ok(id)
    }

    async fn get_script(&self, id: i64) -> anyhow::Result<Option<Script>> {
        let row = sqlx::query_as::<_, ScriptRow>(
            "SELECT id, title, script_data, source_articles, created_at FROM comedy_scripts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch script")?;

        Ok(row.map(Script::from))
    }

    async fn list_scripts(&self, limit: usize) -> anyhow::Result<Vec<Script>> {
        let rows = sqlx::query_as::<_, ScriptRow>(
            r#"
            SELECT id, title, script_data, source_articles, created_at
            FROM comedy_scripts
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list scripts")?;

        Ok(rows.into_iter().map(Script::from).collect())
    }

    async fn get_scripts_by_source(&self, article_id: &str) -> anyhow::Result<Vec<Script>> {
        let rows = sqlx::query_as::<_, ScriptRow>(
            r#"
            SELECT id, title, script_data, source_articles, created_at
            FROM comedy_scripts
            WHERE $1 = ANY(source_articles)
            ORDER BY created_at DESC
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch scripts by source")?;

        Ok(rows.into_iter().map(Script::from).collect())
    }

    async fn get_scripted_article_ids(
        &self,
        article_ids: &[&str],
    ) -> anyhow::Result<HashSet<String>> {
        let rows = sqlx::query_as::<_, ArticleId>(
            r#"
            SELECT DISTINCT s.article_id
            FROM comedy_scripts, unnest(source_articles) AS s(article_id)
            WHERE s.article_id = ANY($1)
            "#,
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch scripted article ids"))
        .context("Failed to fetch scripted article ids")?;

        Ok(rows.into_iter().map(|r| r.article_id).collect())
    }
}

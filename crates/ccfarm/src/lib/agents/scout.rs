use anyhow::Context;
use ccfarm_datastore::{ArticleScore, ScoreStore};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::{
    agents::{generate_reply, AgentProfile, Backoff},
    llm::{LanguageModel, LlmError},
    news::{NewsQuery, NewsSource, SortBy},
    types::{Article, ScoredArticle},
    Error,
};

const PROFILE: AgentProfile = AgentProfile {
    name: "NewsScout",
    system_prompt: include_str!("prompts/scout_system.txt"),
    temperature: 0.3,
    response_tag: "brief_json",
    response_schema: include_str!("prompts/scout_schema.json"),
};

/// Search parameters for a scouting run
#[derive(Debug, Clone, PartialEq)]
pub struct ScoutOptions {
    pub query: String,
    pub page_size: u32,
    pub days_in_past: i64,
    pub sort_by: SortBy,
    pub language: String,
    /// Articles scoring below this are dropped from the results
    pub min_score: u8,
}

impl Default for ScoutOptions {
    fn default() -> Self {
        Self {
            query: "artificial intelligence".into(),
            page_size: 20,
            days_in_past: 7,
            sort_by: SortBy::Relevancy,
            language: "en".into(),
            min_score: 0,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct RawScore {
    score: i64,
    reason: String,
}

/// Rates news articles for their comedy potential
#[derive(Debug, Clone)]
pub struct NewsScout<L> {
    llm: L,
    backoff: Backoff,
}

impl<L: LanguageModel + Sync> NewsScout<L> {
    pub fn new(llm: L) -> Self {
        Self {
            llm,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Scores a single article from its title and description.
    ///
    /// Never fails: scoring errors yield a zero score carrying the error.
    #[tracing::instrument(skip_all, fields(title = article.title_or_unknown()))]
    pub async fn score_article(&self, article: &Article) -> ArticleScore {
        match self.request_score(article).await {
            Ok(score) => score,
            Err(e) => {
                tracing::error!(error = %e, "Error scoring article");
                ArticleScore::failed(e)
            }
        }
    }

    async fn request_score(&self, article: &Article) -> Result<ArticleScore, LlmError> {
        let prompt = format!(
            "Rate the comedy potential of this news article.\n\n\
             Title: {}\n\
             Description: {}\n\
             Source: {}",
            article.title_or_unknown(),
            article.description.as_deref().unwrap_or_default(),
            article
                .source
                .as_ref()
                .and_then(|s| s.name.as_deref())
                .unwrap_or("Unknown"),
        );

        let raw: RawScore = generate_reply(&self.llm, &PROFILE, &self.backoff, &prompt).await?;
        ArticleScore::new(raw.score, raw.reason)
            .map_err(|e| LlmError::Response(Error::Validation(e.to_string())))
    }

    /// Scores `articles`, reusing cached scores and caching new ones.
    ///
    /// Articles without a title, description or url are skipped. The result
    /// is ordered by score, highest first.
    pub async fn quick_score_articles<S>(
        &self,
        articles: Vec<Article>,
        store: &S,
    ) -> anyhow::Result<Vec<ScoredArticle>>
    where
        S: ScoreStore + Sync,
    {
        let mut scored = Vec::with_capacity(articles.len());

        for article in articles {
            let (Some(title), Some(_)) = (
                non_empty(&article.title),
                non_empty(&article.description),
            ) else {
                tracing::warn!("Skipping article with missing title or description");
                continue;
            };
            let title = title.to_string();
            let Some(url) = non_empty(&article.url).map(str::to_string) else {
                tracing::warn!(title, "Skipping article with missing URL");
                continue;
            };

            let cached = store.get_score(&url).await.unwrap_or_else(|e| {
                tracing::warn!(error = ?e, url, "Failed to read score cache");
                None
            });

            let score = match cached {
                Some(score) => {
                    tracing::info!(title, score = score.score, "Found cached score");
                    score
                }
                None => {
                    tracing::info!(title, "Scoring new article");
                    let score = self.score_article(&article).await;
                    tracing::info!(title, score = score.score, "Article scored");

                    store
                        .save_score(&url, &title, &score)
                        .await
                        .inspect_err(|e| tracing::error!(error = ?e, url, "Failed to cache score"))
                        .context("Failed to cache article score")?;
                    score
                }
            };

            scored.push(ScoredArticle { article, score });
        }

        scored.sort_by(|a, b| b.score.score.cmp(&a.score.score));
        Ok(scored)
    }

    /// Searches for recent articles and returns them scored, best first
    #[tracing::instrument(skip(self, news, store), fields(query = %options.query))]
    pub async fn dig_for_news<N, S>(
        &self,
        news: &N,
        store: &S,
        options: &ScoutOptions,
    ) -> anyhow::Result<Vec<ScoredArticle>>
    where
        N: NewsSource + Sync,
        S: ScoreStore + Sync,
    {
        let from = Duration::try_days(options.days_in_past)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .with_context(|| {
                format!("Search window of {} days is out of range", options.days_in_past)
            })?
            .date_naive();
        let query = NewsQuery::new(&options.query)
            .page_size(options.page_size)
            .sort_by(options.sort_by)
            .language(&options.language)
            .from_date(from);

        tracing::info!(page_size = query.page_size, "Fetching articles");
        let articles = news
            .search(&query)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to search news"))
            .context("Failed to search news")?;

        if articles.is_empty() {
            anyhow::bail!("No articles found!");
        }

        tracing::info!(count = articles.len(), "Scoring articles");
        let scored = self.quick_score_articles(articles, store).await?;

        // scores are already saved, a failed eviction only delays it
        let removed = store.cleanup_expired().await.unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "Failed to clean up expired scores");
            0
        });
        tracing::info!(count = removed, "Removed expired entries from cache");

        Ok(scored
            .into_iter()
            .filter(|s| s.score.score >= options.min_score)
            .collect())
    }
}

pub mod builder;

use std::path::PathBuf;

use anyhow::Context;
use ccfarm_datastore::{Brief, CachedScore, DataStore, NewScript, Script};
use itertools::Itertools;
use serde_json::json;

use crate::{
    agents::{
        debriefer::Debriefer,
        satirist::Satirist,
        scout::{NewsScout, ScoutOptions},
    },
    llm::LanguageModel,
    media::{PrivacyStatus, Studio, VideoMetadata, VideoUploader},
    news::{HeadlinesQuery, NewsSource},
    notify::TeamsWebhook,
    report,
    types::{slugify, Article, ArticleAnalysis, ScoredArticle, ScriptSource, VideoScript},
};

/// A brief that was generated and stored during a run
#[derive(Debug, Clone, PartialEq)]
pub struct BriefOutcome {
    pub article_id: String,
    pub title: String,
    pub analysis: ArticleAnalysis,
}

/// Result of the end-to-end video flow
#[derive(Debug, Clone, PartialEq)]
pub struct ProducedVideo {
    pub script_id: i64,
    pub path: PathBuf,
    /// Public url, `None` when the upload was skipped
    pub url: Option<String>,
}

/// The comedy content pipeline: scouting, briefing, script writing and
/// video production on top of a shared store
pub struct ContentFarm<D, N, L, P, U>
where
    D: DataStore + Send + Sync + 'static,
    N: NewsSource + Send + Sync + 'static,
    L: LanguageModel + Send + Sync + 'static,
    P: Studio + Send + Sync + 'static,
    U: VideoUploader + Send + Sync + 'static,
{
    workdir: PathBuf,
    store: D,
    news: N,
    scout: NewsScout<L>,
    debriefer: Debriefer<L>,
    satirist: Satirist<L>,
    studio: P,
    uploader: U,
    notifier: Option<TeamsWebhook>,
    privacy: PrivacyStatus,
    dry_run: bool,
}

impl<D, N, L, P, U> ContentFarm<D, N, L, P, U>
where
    D: DataStore + Send + Sync + 'static,
    N: NewsSource + Send + Sync + 'static,
    L: LanguageModel + Send + Sync + 'static,
    P: Studio + Send + Sync + 'static,
    U: VideoUploader + Send + Sync + 'static,
{
    /// How many cached scores are considered before filtering
    const CANDIDATE_POOL: usize = 50;

    pub fn store(&self) -> &D {
        &self.store
    }

    async fn notify(&self, title: &str, message: &str) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        tracing::info!(message, "Sending notification");
        if let Err(e) = notifier.notify(title, message).await {
            tracing::error!(error = ?e, "Failed to send notification");
        }
    }

    /// Searches, scores and reports on the latest news
    #[tracing::instrument(skip(self))]
    pub async fn score_news(&self, options: &ScoutOptions) -> anyhow::Result<Vec<ScoredArticle>> {
        let scored = self
            .scout
            .dig_for_news(&self.news, &self.store, options)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to dig for news"))?;

        self.report_scores(&scored, &options.query).await?;
        Ok(scored)
    }

    /// Scores and reports on the current top headlines
    #[tracing::instrument(skip(self))]
    pub async fn score_headlines(
        &self,
        query: &HeadlinesQuery,
        min_score: u8,
    ) -> anyhow::Result<Vec<ScoredArticle>> {
        let articles = self
            .news
            .top_headlines(query)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch headlines"))
            .context("Failed to fetch top headlines")?;
        if articles.is_empty() {
            anyhow::bail!("No headlines found!");
        }

        tracing::info!(count = articles.len(), "Scoring headlines");
        let scored = self
            .scout
            .quick_score_articles(articles, &self.store)
            .await?
            .into_iter()
            .filter(|s| s.score.score >= min_score)
            .collect::<Vec<_>>();

        let label = query.query.as_deref().unwrap_or("top headlines");
        self.report_scores(&scored, label).await?;
        Ok(scored)
    }

    async fn report_scores(&self, scored: &[ScoredArticle], query: &str) -> anyhow::Result<()> {
        let path = report::write_report(
            &self.workdir.join("reports"),
            report::SCORING_REPORT_FILE,
            &report::scoring_report(scored),
        )
        .await?;
        tracing::info!(path = %path.display(), count = scored.len(), "Wrote scoring report");

        self.notify("News Scoring", &report::scoring_notification(scored, query))
            .await;
        Ok(())
    }

    /// Best cached scores, minus the articles already briefed or scripted
    async fn top_candidates(
        &self,
        limit: usize,
        reanalyze: bool,
        kind: Candidates,
    ) -> anyhow::Result<Vec<CachedScore>> {
        tracing::info!(limit, reanalyze, "Retrieving top articles");

        let cached = self
            .store
            .list_scores(Self::CANDIDATE_POOL)
            .await
            .context("Failed to list cached scores")?;
        if cached.is_empty() {
            tracing::warn!("No scored articles found in storage");
            return Ok(Vec::new());
        }

        if reanalyze {
            return Ok(cached.into_iter().take(limit).collect());
        }

        let ids = cached.iter().map(|c| c.url.as_str()).collect::<Vec<_>>();
        let processed = match kind {
            Candidates::Unbriefed => self.store.get_briefed_article_ids(&ids).await,
            Candidates::Unscripted => self.store.get_scripted_article_ids(&ids).await,
        }
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to get processed article IDs"))
        .context("Failed to get processed article IDs")?;

        let total = cached.len();
        let result = cached
            .into_iter()
            .filter(|c| !processed.contains(&c.url))
            .take(limit)
            .collect::<Vec<_>>();
        tracing::info!(
            filtered = total - result.len(),
            remaining = result.len(),
            "Filtered already processed articles"
        );

        Ok(result)
    }

    #[tracing::instrument(skip(self, cached), fields(url = %cached.url))]
    async fn brief_article(&self, cached: &CachedScore) -> anyhow::Result<Option<BriefOutcome>> {
        let Some(content) = self.news.fetch_article_content(&cached.url).await else {
            tracing::warn!("Could not fetch content");
            return Ok(None);
        };

        let article = Article::from(cached);
        let analysis = self
            .debriefer
            .analyze_article(&article, &content)
            .await
            .context("Failed to analyze article")?;

        self.store
            .store_brief(
                &cached.url,
                &serde_json::to_value(&analysis)?,
                Some(&json!({ "title": cached.title, "url": cached.url })),
            )
            .await
            .context("Failed to store brief")?;

        Ok(Some(BriefOutcome {
            article_id: cached.url.clone(),
            title: cached.title.clone(),
            analysis,
        }))
    }

    /// Writes detailed briefs for the best scored articles
    #[tracing::instrument(skip(self))]
    pub async fn brief_top_articles(
        &self,
        limit: usize,
        reanalyze: bool,
    ) -> anyhow::Result<Vec<BriefOutcome>> {
        let candidates = self
            .top_candidates(limit, reanalyze, Candidates::Unbriefed)
            .await?;
        if candidates.is_empty() {
            tracing::info!("No articles to analyze");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(candidates.len());
        for cached in &candidates {
            match self.brief_article(cached).await {
                Ok(Some(outcome)) => {
                    tracing::info!(title = %cached.title, "Successfully analyzed article");
                    outcomes.push(outcome);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = ?e, title = %cached.title, "Error processing article")
                }
            }
        }

        let summary = report::brief_summary(&outcomes);
        tracing::info!(%summary, "Analysis complete");
        self.notify(
            "Comedy Brief Analysis",
            &format!("Comedy Brief Analysis Results:\n\n{summary}"),
        )
        .await;

        Ok(outcomes)
    }

    /// Stored brief of `article_id`, if any
    async fn stored_analysis(&self, article_id: &str) -> Option<serde_json::Value> {
        self.store
            .get_brief(article_id)
            .await
            .inspect_err(|e| tracing::warn!(error = ?e, article_id, "Failed to load brief"))
            .ok()
            .flatten()
            .map(|brief| brief.model_output)
    }

    async fn script_article(&self, cached: &CachedScore) -> anyhow::Result<(i64, VideoScript)> {
        let source = ScriptSource {
            title: cached.title.clone(),
            url: cached.url.clone(),
            description: None,
            score: Some(cached.score.clone()),
            analysis: self.stored_analysis(&cached.url).await,
        };

        let script = self
            .satirist
            .write_script(std::slice::from_ref(&source))
            .await
            .context("Failed to write script")?;

        let id = self
            .store
            .store_script(&NewScript {
                title: script.title.clone(),
                script_data: serde_json::to_value(&script)?,
                source_articles: vec![cached.url.clone()],
            })
            .await
            .context("Failed to store script")?;

        Ok((id, script))
    }

    /// Writes one script per top scored article that has none yet
    #[tracing::instrument(skip(self))]
    pub async fn write_scripts(
        &self,
        limit: usize,
        reanalyze: bool,
    ) -> anyhow::Result<Vec<(i64, VideoScript)>> {
        let candidates = self
            .top_candidates(limit, reanalyze, Candidates::Unscripted)
            .await?;
        if candidates.is_empty() {
            tracing::info!("No articles to process");
            return Ok(Vec::new());
        }

        let mut scripts = Vec::with_capacity(candidates.len());
        for cached in &candidates {
            match self.script_article(cached).await {
                Ok((id, script)) => {
                    tracing::info!(script_id = id, article_id = %cached.url, "Processed and stored script");
                    scripts.push((id, script));
                }
                Err(e) => {
                    tracing::error!(error = ?e, article_id = %cached.url, "Error processing script")
                }
            }
        }

        let summary = report::script_summary(&scripts);
        tracing::info!(%summary, "Script generation complete");
        self.notify("Comedy Script Generation", &summary).await;

        Ok(scripts)
    }

    /// Scouts the news, writes a single script about the best articles,
    /// renders it and uploads the result
    #[tracing::instrument(skip(self))]
    pub async fn produce_video(
        &self,
        options: &ScoutOptions,
        articles_to_use: usize,
    ) -> anyhow::Result<Option<ProducedVideo>> {
        let scored = self
            .scout
            .dig_for_news(&self.news, &self.store, options)
            .await?;

        let top = scored.into_iter().take(articles_to_use).collect::<Vec<_>>();
        if top.is_empty() {
            tracing::warn!("No articles found to process");
            return Ok(None);
        }

        let mut sources = Vec::with_capacity(top.len());
        for scored in &top {
            let mut source = ScriptSource::from(scored);
            source.analysis = self.stored_analysis(scored.url()).await;
            sources.push(source);
        }

        tracing::info!(count = sources.len(), "Processing articles into one script");
        let script = self
            .satirist
            .write_script(&sources)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to write script"))
            .context("Failed to write script")?;

        let source_articles = top.iter().map(|s| s.url().to_string()).collect_vec();
        let script_id = self
            .store
            .store_script(&NewScript {
                title: script.title.clone(),
                script_data: serde_json::to_value(&script)?,
                source_articles,
            })
            .await
            .context("Failed to store script")?;
        tracing::info!(script_id, title = %script.title, "Stored multi-article script");

        self.publish(script_id, &script).await.map(Some)
    }

    /// Renders and uploads a script that was stored by an earlier run
    #[tracing::instrument(skip(self))]
    pub async fn produce_stored_script(&self, script_id: i64) -> anyhow::Result<ProducedVideo> {
        let stored = self
            .store
            .get_script(script_id)
            .await
            .context("Failed to load script")?
            .with_context(|| format!("Script {script_id} not found"))?;

        let script: VideoScript = serde_json::from_value(stored.script_data)
            .with_context(|| format!("Script {script_id} is not a valid video script"))?;
        tracing::info!(title = %script.title, "Loaded stored script");

        self.publish(script_id, &script).await
    }

    async fn publish(&self, script_id: i64, script: &VideoScript) -> anyhow::Result<ProducedVideo> {
        let slug = slugify(&script.title);
        let file_name = if slug.is_empty() {
            format!("script-{script_id}.mp4")
        } else {
            format!("{slug}.mp4")
        };
        let output = self.workdir.join("videos").join(file_name);
        tracing::info!(path = %output.display(), "Converting script to video");

        let path = self
            .studio
            .render(script, &output)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to render video"))
            .context("Failed to render video")?;

        let url = if self.dry_run {
            tracing::info!("Dry run, skipping upload");
            None
        } else {
            let mut metadata = VideoMetadata::from(script);
            metadata.privacy = self.privacy;

            let url = self
                .uploader
                .upload(&path, &metadata)
                .await
                .inspect_err(|e| tracing::error!(error = %e, "Failed to upload video"))
                .context("Failed to upload video")?;
            tracing::info!(%url, "Video uploaded successfully");
            Some(url)
        };

        self.notify(
            "Comedy Video",
            &format!(
                "🎬 New video \"{}\": {}",
                script.title,
                url.as_deref().unwrap_or("upload skipped")
            ),
        )
        .await;

        Ok(ProducedVideo {
            script_id,
            path,
            url,
        })
    }

    /// Most recent briefs, newest first
    pub async fn recent_briefs(&self, limit: usize) -> anyhow::Result<Vec<Brief>> {
        self.store
            .list_briefs(limit)
            .await
            .context("Failed to list briefs")
    }

    /// Most recent scripts, newest first
    pub async fn recent_scripts(&self, limit: usize) -> anyhow::Result<Vec<Script>> {
        self.store
            .list_scripts(limit)
            .await
            .context("Failed to list scripts")
    }

    /// Evicts expired cached scores
    pub async fn cleanup(&self) -> anyhow::Result<u64> {
        let removed = self.store.cleanup_expired().await?;
        tracing::info!(count = removed, "Removed expired entries from cache");
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy)]
enum Candidates {
    Unbriefed,
    Unscripted,
}

use std::{path::PathBuf, str::FromStr};

use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use anyhow::Context;
use ccfarm::{
    llm::{anthropic::AnthropicClient, openai::OpenAIClient},
    media::{
        ElevenLabsVoice, Ffmpeg, FfmpegStudio, GiphyClient, PrivacyStatus, StockMedia,
        UnsplashClient, YouTubeUploader,
    },
    news::{newsapi::NewsApiClient, HeadlinesQuery, SortBy},
    notify::TeamsWebhook,
    tracing::init_tracing_subscriber,
    ContentFarm, ContentFarmBuilder, LanguageModel, ScoutOptions,
};
use ccfarm_datastore::{PgDataStore, DEFAULT_CACHE_DAYS, MAX_CACHE_DAYS};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cron::Schedule;
use url::Url;

#[derive(Parser)]
#[command(name = "ccfarm", about = "Comedy content farm: news in, satirical videos out")]
struct Cli {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Language model provider used by every agent
    #[arg(long, env = "LLM_PROVIDER", value_enum, default_value_t = LlmProvider::Anthropic)]
    llm: LlmProvider,

    /// Anthropic API key, required with `--llm anthropic`
    #[arg(long, env = "ANTHROPIC_API_KEY")]
    anthropic_key: Option<String>,

    /// OpenAI API key, required with `--llm openai`
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_key: Option<String>,

    /// Overrides the provider's default model
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// newsapi.org API key
    #[arg(long, env = "NEWS_API_KEY")]
    news_api_key: String,

    /// ElevenLabs API key
    #[arg(long, env = "ELEVENLABS_API_KEY")]
    elevenlabs_key: String,

    /// Giphy API key
    #[arg(long, env = "GIPHY_API_KEY")]
    giphy_key: String,

    /// Unsplash access key
    #[arg(long, env = "UNSPLASH_API_KEY")]
    unsplash_key: String,

    #[arg(long, env = "YOUTUBE_CLIENT_ID")]
    youtube_client_id: String,

    #[arg(long, env = "YOUTUBE_CLIENT_SECRET")]
    youtube_client_secret: String,

    #[arg(long, env = "YOUTUBE_REFRESH_TOKEN")]
    youtube_refresh_token: String,

    /// Microsoft Teams incoming webhook for run notifications
    #[arg(long, env = "TEAMS_WEBHOOK_URL")]
    teams_webhook_url: Option<Url>,

    /// Days a cached article score stays valid
    #[arg(
        long,
        env = "CACHE_DAYS",
        default_value_t = DEFAULT_CACHE_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_CACHE_DAYS)
    )]
    cache_days: i64,

    /// Working directory for reports and videos
    #[arg(long, default_value = "/var/tmp/ccfarm")]
    workdir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LlmProvider {
    Anthropic,
    #[value(name = "openai")]
    OpenAI,
}

#[derive(Args, Clone, Debug)]
struct ScoutArgs {
    /// News search query
    #[arg(long, default_value = "artificial intelligence")]
    query: String,

    /// Number of articles to fetch
    #[arg(long, default_value_t = 20)]
    page_size: u32,

    /// How many days back to search
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(i64).range(0..=3650))]
    days: i64,

    /// relevancy, popularity or publishedAt
    #[arg(long, default_value = "relevancy")]
    sort_by: SortBy,

    #[arg(long, default_value = "en")]
    language: String,

    /// Drop articles scoring below this
    #[arg(long, default_value_t = 6)]
    min_score: u8,
}

impl From<ScoutArgs> for ScoutOptions {
    fn from(args: ScoutArgs) -> Self {
        ScoutOptions {
            query: args.query,
            page_size: args.page_size,
            days_in_past: args.days,
            sort_by: args.sort_by,
            language: args.language,
            min_score: args.min_score,
        }
    }
}

#[derive(Args, Clone, Debug)]
struct HeadlinesArgs {
    /// Two letter country code, e.g. us
    #[arg(long)]
    country: Option<String>,

    /// business, entertainment, general, health, science, sports or technology
    #[arg(long)]
    category: Option<String>,

    /// Keywords the headlines must contain
    #[arg(long)]
    query: Option<String>,

    #[arg(long, default_value_t = 20)]
    page_size: u32,

    /// Drop headlines scoring below this
    #[arg(long, default_value_t = 6)]
    min_score: u8,
}

impl From<&HeadlinesArgs> for HeadlinesQuery {
    fn from(args: &HeadlinesArgs) -> Self {
        HeadlinesQuery {
            country: args.country.clone(),
            category: args.category.clone(),
            query: args.query.clone(),
            page_size: args.page_size,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Search and score news, writing a markdown report
    Score {
        #[command(flatten)]
        scout: ScoutArgs,
    },
    /// Score the current top headlines, writing a markdown report
    Headlines {
        #[command(flatten)]
        headlines: HeadlinesArgs,
    },
    /// Write briefs for the best scored articles
    Brief {
        #[arg(long, default_value_t = 3)]
        limit: usize,
        /// Analyze articles again even if they were already briefed
        #[arg(long)]
        reanalyze: bool,
    },
    /// Write one script per top scored article
    Script {
        #[arg(long, default_value_t = 3)]
        limit: usize,
        /// Write scripts even for articles that already have one
        #[arg(long)]
        reanalyze: bool,
    },
    /// Scout, script, render and upload a single video
    Produce {
        #[command(flatten)]
        scout: ScoutArgs,
        /// Number of top articles the video covers
        #[arg(long, default_value_t = 3)]
        articles: usize,
        /// Render the video but skip the upload
        #[arg(long)]
        dry_run: bool,
        /// public, unlisted or private
        #[arg(long, default_value = "public")]
        privacy: PrivacyStatus,
    },
    /// Render and upload a script stored by an earlier run
    Render {
        /// Id of the stored script
        script_id: i64,
        /// Render the video but skip the upload
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value = "public")]
        privacy: PrivacyStatus,
    },
    /// Show the most recent briefs
    ListBriefs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show the most recent scripts and their ids
    ListScripts {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Remove expired cached scores
    Cleanup,
    /// Start the cron scheduler producing a video per tick
    Cron {
        /// Cron schedule expression
        #[arg(long, env = "CRON_SCHEDULE", default_value = "0 0 */6 * * *")]
        schedule: String,
        #[command(flatten)]
        scout: ScoutArgs,
        #[arg(long, default_value_t = 3)]
        articles: usize,
        #[arg(long, default_value = "public")]
        privacy: PrivacyStatus,
    },
}

type Farm<L> = ContentFarm<
    PgDataStore,
    NewsApiClient,
    L,
    FfmpegStudio<ElevenLabsVoice, StockMedia>,
    YouTubeUploader,
>;

#[derive(Clone)]
struct Config {
    db_url: String,
    llm: LlmProvider,
    anthropic_key: Option<String>,
    openai_key: Option<String>,
    model: Option<String>,
    news_api_key: String,
    elevenlabs_key: String,
    giphy_key: String,
    unsplash_key: String,
    youtube_client_id: String,
    youtube_client_secret: String,
    youtube_refresh_token: String,
    teams_webhook_url: Option<Url>,
    cache_days: i64,
    workdir: PathBuf,
}

impl Config {
    fn anthropic(&self) -> anyhow::Result<AnthropicClient> {
        let key = self
            .anthropic_key
            .as_deref()
            .context("ANTHROPIC_API_KEY is required with --llm anthropic")?;
        let client = AnthropicClient::new(key);
        Ok(match &self.model {
            Some(model) => client.with_model(model),
            None => client,
        })
    }

    fn openai(&self) -> anyhow::Result<OpenAIClient> {
        let key = self
            .openai_key
            .as_deref()
            .context("OPENAI_API_KEY is required with --llm openai")?;
        let client = OpenAIClient::new(key);
        Ok(match &self.model {
            Some(model) => client.with_model(model),
            None => client,
        })
    }
}

/// Settings of the scheduled video run
#[derive(Clone)]
struct CronJob {
    config: Config,
    scout: ScoutOptions,
    articles: usize,
    privacy: PrivacyStatus,
}

async fn build_farm<L>(
    config: &Config,
    llm: L,
    privacy: PrivacyStatus,
    dry_run: bool,
) -> anyhow::Result<Farm<L>>
where
    L: LanguageModel + Clone + Send + Sync + 'static,
{
    let store = PgDataStore::init(&config.db_url)
        .await?
        .with_cache_days(config.cache_days);

    let studio = FfmpegStudio::new(
        ElevenLabsVoice::new(&config.elevenlabs_key),
        StockMedia::new(
            GiphyClient::new(&config.giphy_key),
            UnsplashClient::new(&config.unsplash_key),
        ),
        Ffmpeg::default(),
    );

    let farm = ContentFarmBuilder::new(&config.workdir)
        .store(store)
        .news(NewsApiClient::new(&config.news_api_key))
        .llm(llm)
        .studio(studio)
        .uploader(YouTubeUploader::new(
            &config.youtube_client_id,
            &config.youtube_client_secret,
            &config.youtube_refresh_token,
        ))
        .notifier(
            config
                .teams_webhook_url
                .as_ref()
                .map(|url| TeamsWebhook::new(url.as_str())),
        )
        .privacy(privacy)
        .dry_run(dry_run)
        .build();

    Ok(farm)
}

async fn run_produce<L>(
    config: &Config,
    llm: L,
    scout: &ScoutOptions,
    articles: usize,
    privacy: PrivacyStatus,
    dry_run: bool,
) -> anyhow::Result<()>
where
    L: LanguageModel + Clone + Send + Sync + 'static,
{
    let farm = build_farm(config, llm, privacy, dry_run).await?;

    match farm.produce_video(scout, articles).await? {
        Some(video) => tracing::info!(
            script_id = video.script_id,
            path = %video.path.display(),
            url = video.url.as_deref().unwrap_or("not uploaded"),
            "Video produced"
        ),
        None => tracing::warn!("No video was produced"),
    }

    farm.cleanup().await?;
    Ok(())
}

async fn handle_tick(_tick: Tick, job: Data<CronJob>) -> anyhow::Result<()> {
    tracing::info!(
        query = %job.scout.query,
        articles = job.articles,
        "Running scheduled video production..."
    );

    let config = &job.config;
    match config.llm {
        LlmProvider::Anthropic => {
            let llm = config.anthropic()?;
            run_produce(config, llm, &job.scout, job.articles, job.privacy, false).await
        }
        LlmProvider::OpenAI => {
            let llm = config.openai()?;
            run_produce(config, llm, &job.scout, job.articles, job.privacy, false).await
        }
    }
}

async fn run_cron(
    config: Config,
    schedule: &str,
    scout: ScoutOptions,
    articles: usize,
    privacy: PrivacyStatus,
) -> anyhow::Result<()> {
    tracing::info!(%schedule, "Starting cron scheduler...");
    let schedule = Schedule::from_str(schedule)?;

    let job = CronJob {
        config,
        scout,
        articles,
        privacy,
    };

    let worker = WorkerBuilder::new("ccfarm-cron")
        .backend(CronStream::new(schedule))
        .retry(RetryPolicy::retries(3))
        .layer(SentryLayer::new())
        .data(job)
        .build(handle_tick);

    worker.run().await?;
    Ok(())
}

/// Runs a one-off command with the chosen language model
async fn execute<L>(command: Command, config: Config, llm: L) -> anyhow::Result<()>
where
    L: LanguageModel + Clone + Send + Sync + 'static,
{
    match command {
        Command::Score { scout } => {
            let options = ScoutOptions::from(scout);
            tracing::info!(query = %options.query, "Scoring news...");
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            let scored = farm.score_news(&options).await?;
            tracing::info!(count = scored.len(), "Scoring complete");
        }
        Command::Headlines { headlines } => {
            tracing::info!(?headlines, "Scoring top headlines...");
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            let scored = farm
                .score_headlines(&HeadlinesQuery::from(&headlines), headlines.min_score)
                .await?;
            tracing::info!(count = scored.len(), "Scoring complete");
        }
        Command::Brief { limit, reanalyze } => {
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            let briefs = farm.brief_top_articles(limit, reanalyze).await?;
            tracing::info!(count = briefs.len(), "Briefing complete");
        }
        Command::Script { limit, reanalyze } => {
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            let scripts = farm.write_scripts(limit, reanalyze).await?;
            tracing::info!(count = scripts.len(), "Script writing complete");
        }
        Command::Produce {
            scout,
            articles,
            dry_run,
            privacy,
        } => {
            tracing::info!(articles, dry_run, %privacy, "Producing video once...");
            run_produce(&config, llm, &scout.into(), articles, privacy, dry_run).await?;
        }
        Command::Render {
            script_id,
            dry_run,
            privacy,
        } => {
            tracing::info!(script_id, dry_run, %privacy, "Producing stored script...");
            let farm = build_farm(&config, llm, privacy, dry_run).await?;
            let video = farm.produce_stored_script(script_id).await?;
            tracing::info!(
                script_id,
                path = %video.path.display(),
                url = video.url.as_deref().unwrap_or("not uploaded"),
                "Video produced"
            );
        }
        Command::ListBriefs { limit } => {
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            for brief in farm.recent_briefs(limit).await? {
                tracing::info!(
                    article_id = %brief.article_id,
                    created_at = %brief.created_at,
                    "Brief"
                );
            }
        }
        Command::ListScripts { limit } => {
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            for script in farm.recent_scripts(limit).await? {
                tracing::info!(
                    script_id = script.id,
                    title = %script.title,
                    sources = ?script.source_articles,
                    created_at = %script.created_at,
                    "Script"
                );
            }
        }
        Command::Cleanup => {
            let farm = build_farm(&config, llm, PrivacyStatus::default(), true).await?;
            farm.cleanup().await?;
        }
        Command::Cron {
            schedule,
            scout,
            articles,
            privacy,
        } => run_cron(config, &schedule, scout.into(), articles, privacy).await?,
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let config = Config {
        db_url: cli.database_url,
        llm: cli.llm,
        anthropic_key: cli.anthropic_key,
        openai_key: cli.openai_key,
        model: cli.model,
        news_api_key: cli.news_api_key,
        elevenlabs_key: cli.elevenlabs_key,
        giphy_key: cli.giphy_key,
        unsplash_key: cli.unsplash_key,
        youtube_client_id: cli.youtube_client_id,
        youtube_client_secret: cli.youtube_client_secret,
        youtube_refresh_token: cli.youtube_refresh_token,
        teams_webhook_url: cli.teams_webhook_url,
        cache_days: cli.cache_days,
        workdir: cli.workdir,
    };

    tracing::info!(llm = ?config.llm, "Using language model provider");
    match config.llm {
        LlmProvider::Anthropic => {
            let llm = config.anthropic()?;
            execute(cli.command, config, llm).await
        }
        LlmProvider::OpenAI => {
            let llm = config.openai()?;
            execute(cli.command, config, llm).await
        }
    }
}

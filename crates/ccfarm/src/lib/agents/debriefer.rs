use crate::{
    agents::{generate_reply, AgentProfile, Backoff},
    llm::{LanguageModel, LlmError},
    types::{Article, ArticleAnalysis},
};

const PROFILE: AgentProfile = AgentProfile {
    name: "NewsDebriefer",
    system_prompt: include_str!("prompts/debriefer_system.txt"),
    temperature: 0.3,
    response_tag: "brief_json",
    response_schema: include_str!("prompts/debriefer_schema.json"),
};

/// Characters of article text handed to the model
const MAX_CONTENT_CHARS: usize = 12_000;

/// Produces a detailed comedic brief from an article's full text
#[derive(Debug, Clone)]
pub struct Debriefer<L> {
    llm: L,
    backoff: Backoff,
}

impl<L: LanguageModel + Sync> Debriefer<L> {
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

    #[tracing::instrument(skip_all, fields(title = article.title_or_unknown()))]
    pub async fn analyze_article(
        &self,
        article: &Article,
        content: &str,
    ) -> Result<ArticleAnalysis, LlmError> {
        tracing::info!("Analyzing article");

        let content: String = content.chars().take(MAX_CONTENT_CHARS).collect();
        let prompt = format!(
            "Analyze the following news article and prepare a comedy brief for the writers.\n\n\
             Title: {title}\n\
             Url: {url}\n\
             Description: {description}\n\n\
             Full text:\n{content}",
            title = article.title_or_unknown(),
            url = article.url.as_deref().unwrap_or_default(),
            description = article.description.as_deref().unwrap_or_default(),
        );

        let analysis: ArticleAnalysis =
            generate_reply(&self.llm, &PROFILE, &self.backoff, &prompt)
                .await
                .inspect_err(|e| tracing::error!(error = %e, "Error analyzing article"))?;
        analysis.validate()?;

        Ok(analysis)
    }
}

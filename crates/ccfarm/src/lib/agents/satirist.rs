use chrono::Utc;

use crate::{
    agents::{generate_reply, AgentProfile, Backoff},
    llm::{LanguageModel, LlmError},
    types::{ScriptSource, VideoScript},
    Error,
};

const PROFILE: AgentProfile = AgentProfile {
    name: "NewsComedian",
    system_prompt: include_str!("prompts/satirist_system.txt"),
    temperature: 0.7,
    response_tag: "response",
    response_schema: include_str!("prompts/satirist_schema.json"),
};

/// Writes comedy video scripts from analysed news
#[derive(Debug, Clone)]
pub struct Satirist<L> {
    llm: L,
    backoff: Backoff,
}

impl<L: LanguageModel + Sync> Satirist<L> {
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

    #[tracing::instrument(skip_all, fields(count = sources.len()))]
    pub async fn write_script(&self, sources: &[ScriptSource]) -> Result<VideoScript, LlmError> {
        if sources.is_empty() {
            return Err(Error::Validation("no articles to write a script about".into()).into());
        }
        tracing::info!("Generating comedy script");

        let prompt = render_prompt(sources, &Utc::now().format("%A, %B %d, %Y").to_string());
        let script: VideoScript = generate_reply(&self.llm, &PROFILE, &self.backoff, &prompt)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error generating comedy script"))?;
        script.validate()?;

        Ok(script)
    }
}

fn render_prompt(sources: &[ScriptSource], date: &str) -> String {
    let mut prompt = format!(
        "Today is {date}. Write a short satirical news video script covering the \
         following stories. Keep it to two to four segments.\n"
    );

    for (i, source) in sources.iter().enumerate() {
        prompt.push_str(&format!("\n## Story {}: {}\n", i + 1, source.title));
        prompt.push_str(&format!("Url: {}\n", source.url));
        if let Some(description) = &source.description {
            prompt.push_str(&format!("Description: {description}\n"));
        }
        if let Some(score) = &source.score {
            prompt.push_str(&format!(
                "Comedy score: {}/10 ({})\n",
                score.score, score.reason
            ));
        }
        if let Some(analysis) = &source.analysis {
            let brief = serde_json::to_string_pretty(analysis).unwrap_or_default();
            prompt.push_str(&format!("Brief:\n{brief}\n"));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use ccfarm_datastore::ArticleScore;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_prompt_lists_every_story() {
        let sources = vec![
            ScriptSource {
                title: "Robots unionise".into(),
                url: "https://example.com/robots".into(),
                description: Some("Factory robots demand oil breaks".into()),
                score: Some(ArticleScore::new(8, "labour irony").unwrap()),
                analysis: Some(json!({"core_absurdity": "machines on strike"})),
            },
            ScriptSource {
                title: "Chatbot runs for mayor".into(),
                url: "https://example.com/mayor".into(),
                description: None,
                score: None,
                analysis: None,
            },
        ];

        let prompt = render_prompt(&sources, "Monday, March 03, 2025");
        assert!(prompt.starts_with("Today is Monday, March 03, 2025."));
        assert!(prompt.contains("## Story 1: Robots unionise"));
        assert!(prompt.contains("Comedy score: 8/10 (labour irony)"));
        assert!(prompt.contains("machines on strike"));
        assert!(prompt.contains("## Story 2: Chatbot runs for mayor"));
    }
}

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use ccfarm::{CompletionRequest, LanguageModel, LlmError};
use serde_json::json;

/// Answers each agent with a canned reply, picked from its system prompt
#[derive(Clone, Default)]
pub struct MockLanguageModel {
    pub scores: HashMap<String, i64>,
    pub failing_titles: HashSet<String>,
    pub calls: Arc<Mutex<Vec<CompletionRequest>>>,
    pub fail_with: Option<String>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scout scores by article title, unknown titles score 5
    pub fn with_score(mut self, title: &str, score: i64) -> Self {
        self.scores.insert(title.to_string(), score);
        self
    }

    pub fn failing_for(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn calls_to(&self, agent: &str) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system.starts_with(&format!("You are {agent}")))
            .cloned()
            .collect()
    }
}

fn field<'a>(prompt: &'a str, name: &str) -> &'a str {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix(name))
        .map(str::trim)
        .unwrap_or_default()
}

fn api_error(message: &str) -> LlmError {
    LlmError::Api {
        status: 400,
        message: message.to_string(),
    }
}

impl LanguageModel for MockLanguageModel {
    const DEFAULT_MODEL: &'static str = "mock-model";

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(ref msg) = self.fail_with {
            return Err(api_error(msg));
        }

        let title = field(&request.prompt, "Title:");
        if self.failing_titles.contains(title) {
            return Err(api_error("model overloaded"));
        }

        if request.system.starts_with("You are NewsScout") {
            let score = self.scores.get(title).copied().unwrap_or(5);
            let reply = json!({ "score": score, "reason": format!("{title} is funny") });
            return Ok(format!("Sure!\n<brief_json>{reply}</brief_json>"));
        }

        if request.system.starts_with("You are NewsDebriefer") {
            let reply = json!({
                "title": title,
                "summary": "Something happened.",
                "core_absurdity": "It happened at all.",
                "comedy_potential": 7,
                "comedy_angles": [{"approach": "deadpan", "sample_line": "Of course it did."}],
                "news_category": "tech"
            });
            return Ok(format!("<brief_json>{reply}</brief_json>"));
        }

        let reply = json!({
            "title": "Robots Unionise",
            "description": "Factory robots demand oil breaks.",
            "tags": ["AI", "Labour"],
            "segments": [
                {"text": "Breaking news from the factory floor.", "keywords": ["robot"]},
                {"text": "<emphasis>Solidarity</emphasis>, beep boop.", "keywords": ["strike", "protest"]}
            ]
        });
        Ok(format!("<response>\n{reply}\n</response>"))
    }
}

use ccfarm_datastore::{ArticleScore, CachedScore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A news article as returned by the news search API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: Option<ArticleSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

impl Article {
    pub fn title_or_unknown(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}

impl From<&CachedScore> for Article {
    fn from(cached: &CachedScore) -> Self {
        Article {
            title: Some(cached.title.clone()),
            url: Some(cached.url.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub score: ArticleScore,
}

impl ScoredArticle {
    pub fn url(&self) -> &str {
        self.article.url.as_deref().unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.article.title_or_unknown()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComedyAngle {
    pub approach: String,
    pub sample_line: String,
}

/// Detailed comedic analysis of one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub title: String,
    #[serde(default)]
    pub satirical_headlines: Option<Vec<String>>,
    pub summary: String,
    pub core_absurdity: String,
    #[serde(default)]
    pub key_points: Option<Vec<String>>,
    pub comedy_potential: u8,
    pub comedy_angles: Vec<ComedyAngle>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub sensitive_elements: Option<String>,
    pub news_category: String,
}

impl ArticleAnalysis {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(headlines) = &self.satirical_headlines {
            if headlines.len() > 3 {
                return Err(Error::Validation(format!(
                    "expected at most 3 satirical headlines, got {}",
                    headlines.len()
                )));
            }
        }
        if let Some(points) = &self.key_points {
            if points.len() > 5 {
                return Err(Error::Validation(format!(
                    "expected at most 5 key points, got {}",
                    points.len()
                )));
            }
        }
        if !(1..=10).contains(&self.comedy_potential) {
            return Err(Error::Validation(format!(
                "comedy_potential must be within 1..=10, got {}",
                self.comedy_potential
            )));
        }
        if self.comedy_angles.len() > 3 {
            return Err(Error::Validation(format!(
                "expected at most 3 comedy angles, got {}",
                self.comedy_angles.len()
            )));
        }
        Ok(())
    }
}

/// One spoken piece of a script together with the visuals it should show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegment {
    /// Speech text, may contain SSML tags
    pub text: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScript {
    pub title: String,
    pub description: String,
    #[serde(alias = "topic_tags")]
    pub tags: Vec<String>,
    pub segments: Vec<SpeechSegment>,
}

impl VideoScript {
    pub fn validate(&self) -> Result<(), Error> {
        if self.segments.is_empty() {
            return Err(Error::Validation("script has no segments".into()));
        }
        if let Some(idx) = self.segments.iter().position(|s| s.keywords.is_empty()) {
            return Err(Error::Validation(format!(
                "segment {} has no keywords",
                idx + 1
            )));
        }
        Ok(())
    }
}

/// Material handed to the satirist for a single article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptSource {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub score: Option<ArticleScore>,
    /// Stored brief of the article, when one exists
    pub analysis: Option<Value>,
}

impl From<&ScoredArticle> for ScriptSource {
    fn from(scored: &ScoredArticle) -> Self {
        ScriptSource {
            title: scored.title().to_string(),
            url: scored.url().to_string(),
            description: scored.article.description.clone(),
            score: Some(scored.score.clone()),
            analysis: None,
        }
    }
}

/// Lowercase, dash separated form of `title` usable as a file name
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    cleaned
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn analysis() -> ArticleAnalysis {
        serde_json::from_value(json!({
            "title": "Robots unionise",
            "summary": "Factory robots demand oil breaks.",
            "core_absurdity": "Machines asking for rights they were built to replace.",
            "comedy_potential": 8,
            "comedy_angles": [{"approach": "labour dispute", "sample_line": "Beep boop, solidarity."}],
            "news_category": "tech"
        }))
        .unwrap()
    }

    #[test]
    fn test_analysis_optional_fields_default() {
        let analysis = analysis();
        assert!(analysis.satirical_headlines.is_none());
        assert!(analysis.validate().is_ok());
    }

    #[test]
    fn test_analysis_rejects_out_of_range_potential() {
        let mut analysis = analysis();
        analysis.comedy_potential = 0;
        assert!(matches!(analysis.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_analysis_rejects_too_many_headlines() {
        let mut analysis = analysis();
        analysis.satirical_headlines = Some(vec!["a".into(); 4]);
        assert!(analysis.validate().is_err());
    }

    #[test]
    fn test_script_accepts_topic_tags_alias() {
        let script: VideoScript = serde_json::from_value(json!({
            "title": "Siri's Mid-Life Crisis",
            "description": "Apple's assistant forgets you again.",
            "topic_tags": ["Technology", "AI"],
            "segments": [{"text": "Breaking news", "keywords": ["siri-confused"]}]
        }))
        .unwrap();

        assert_eq!(script.tags, vec!["Technology", "AI"]);
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_script_requires_keywords() {
        let script = VideoScript {
            title: "t".into(),
            description: "d".into(),
            tags: vec![],
            segments: vec![SpeechSegment {
                text: "hello".into(),
                keywords: vec![],
            }],
        };
        assert!(matches!(script.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("TikTok's Death Spiral vs. Hard Drive Hoarders"),
            "tiktoks-death-spiral-vs-hard-drive-hoarders"
        );
        assert_eq!(slugify("  AI -- Again!  "), "ai-again");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }
}

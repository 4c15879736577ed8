use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Highest comedy potential an article can be scored with
pub const MAX_SCORE: u8 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("score {0} is out of range 0..={MAX_SCORE}")]
    OutOfRange(i64),
}

/// Comedy potential of a single article, as rated by the scout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleScore {
    pub score: u8,
    pub reason: String,
}

impl ArticleScore {
    pub fn new(score: i64, reason: impl Into<String>) -> Result<Self, ScoreError> {
        if !(0..=MAX_SCORE as i64).contains(&score) {
            return Err(ScoreError::OutOfRange(score));
        }

        Ok(Self {
            score: score as u8,
            reason: reason.into(),
        })
    }

    /// Score given to articles the scout failed to rate
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            score: 0,
            reason: format!("Error in scoring: {reason}"),
        }
    }
}

/// A cached score row, keyed by article url
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScore {
    pub url: String,
    pub title: String,
    pub score: ArticleScore,
    pub cached_at: DateTime<Utc>,
}

/// Structured LLM analysis of an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brief {
    pub article_id: String,
    pub model_output: Value,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: i64,
    pub title: String,
    pub script_data: Value,
    pub source_articles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScript {
    pub title: String,
    pub script_data: Value,
    pub source_articles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert!(ArticleScore::new(0, "dull").is_ok());
        assert!(ArticleScore::new(10, "gold").is_ok());
        assert_eq!(
            ArticleScore::new(11, "too much"),
            Err(ScoreError::OutOfRange(11))
        );
        assert_eq!(
            ArticleScore::new(-1, "negative"),
            Err(ScoreError::OutOfRange(-1))
        );
    }

    #[test]
    fn test_failed_score_is_zero() {
        let score = ArticleScore::failed("timeout");
        assert_eq!(score.score, 0);
        assert_eq!(score.reason, "Error in scoring: timeout");
    }
}

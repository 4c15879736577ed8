//! # News
//!
//! Search and retrieval of news articles. [`NewsSource`] is the seam the
//! pipeline depends on; [`newsapi::NewsApiClient`] implements it against
//! newsapi.org.

pub mod extract;
pub mod newsapi;

use std::{fmt, future::Future, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Article;

pub use newsapi::NewsApiClient;

/// Largest page the news API will serve
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum NewsApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Request failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("API returned error: {code} - {message}")]
    Api { code: String, message: String },
    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Relevancy,
    Popularity,
    PublishedAt,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevancy => "relevancy",
            SortBy::Popularity => "popularity",
            SortBy::PublishedAt => "publishedAt",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevancy" => Ok(SortBy::Relevancy),
            "popularity" => Ok(SortBy::Popularity),
            "publishedat" | "published_at" => Ok(SortBy::PublishedAt),
            other => Err(format!(
                "unknown sort order '{other}', expected relevancy, popularity or publishedAt"
            )),
        }
    }
}

/// Full-text article search
#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub query: String,
    pub page_size: u32,
    pub language: String,
    pub sort_by: SortBy,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Overrides the client's default excluded domains when non-empty
    pub exclude_domains: Vec<String>,
}

impl NewsQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: 20,
            language: "en".into(),
            sort_by: SortBy::Popularity,
            from: None,
            to: None,
            exclude_domains: Vec::new(),
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.min(MAX_PAGE_SIZE);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.from = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.to = Some(date);
        self
    }

    pub fn exclude_domains(mut self, domains: Vec<String>) -> Self {
        self.exclude_domains = domains;
        self
    }
}

/// Breaking news headlines
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlinesQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
    pub page_size: u32,
}

impl Default for HeadlinesQuery {
    fn default() -> Self {
        Self {
            country: None,
            category: None,
            query: None,
            page_size: 20,
        }
    }
}

pub trait NewsSource {
    fn search(
        &self,
        query: &NewsQuery,
    ) -> impl Future<Output = Result<Vec<Article>, NewsApiError>> + Send;

    fn top_headlines(
        &self,
        query: &HeadlinesQuery,
    ) -> impl Future<Output = Result<Vec<Article>, NewsApiError>> + Send;

    /// Readable text of the page at `url`, or `None` when it can't be fetched
    fn fetch_article_content(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(NewsQuery::new("ai").page_size(500).page_size, MAX_PAGE_SIZE);
        assert_eq!(NewsQuery::new("ai").page_size(5).page_size, 5);
    }

    #[test]
    fn test_sort_by_parsing() {
        assert_eq!("publishedAt".parse::<SortBy>(), Ok(SortBy::PublishedAt));
        assert_eq!("Popularity".parse::<SortBy>(), Ok(SortBy::Popularity));
        assert!("newest".parse::<SortBy>().is_err());
        assert_eq!(SortBy::PublishedAt.to_string(), "publishedAt");
    }
}

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::{
    http,
    news::{extract, HeadlinesQuery, NewsApiError, NewsQuery, NewsSource, MAX_PAGE_SIZE},
    types::Article,
};

const USER_AGENT: &str = "AINewsBot/1.0";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const CONTENT_TIMEOUT: Duration = Duration::from_secs(10);
const RATE_LIMIT_WARNING: u32 = 5;

/// Outlets whose articles are paywalled or not worth scoring
pub const DEFAULT_SKIP_DOMAINS: &[&str] = &[
    "biztoc.com",
    "pypi.org",
    "slashdot.org",
    "globenewswire.com",
    "prnewswire.com",
    "businesswire.com",
    "marketscreener.com",
    "seekingalpha.com",
    "wsj.com",
    "ft.com",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

/// Client for the newsapi.org v2 API
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    skip_domains: Vec<String>,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http::default_client(),
            api_key: api_key.into(),
            base_url: "https://newsapi.org/v2".into(),
            skip_domains: DEFAULT_SKIP_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_skip_domains(mut self, domains: Vec<String>) -> Self {
        self.skip_domains = domains;
        self
    }

    fn everything_params(&self, query: &NewsQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.query.clone()),
            ("pageSize", query.page_size.min(MAX_PAGE_SIZE).to_string()),
            ("language", query.language.clone()),
            ("sortBy", query.sort_by.to_string()),
        ];

        let excluded = if query.exclude_domains.is_empty() {
            &self.skip_domains
        } else {
            &query.exclude_domains
        };
        if !excluded.is_empty() {
            params.push(("excludeDomains", excluded.join(",")));
        }

        if let Some(from) = query.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = query.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }

        params
    }

    #[tracing::instrument(skip(self, params))]
    async fn make_request(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<Vec<Article>, NewsApiError> {
        let resp = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(params)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Request failed"))?;

        check_rate_limit(resp.headers())?;

        let body: NewsApiResponse = resp
            .json()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Invalid JSON response"))?;

        if body.status != "ok" {
            return Err(NewsApiError::Api {
                code: body.code.unwrap_or_else(|| "unknown".into()),
                message: body.message.unwrap_or_else(|| "Unknown error".into()),
            });
        }

        tracing::debug!(count = body.articles.len(), "Received articles");
        Ok(body.articles)
    }
}

/// Fails once the daily quota is used up, warns when it is nearly gone
fn check_rate_limit(headers: &HeaderMap) -> Result<(), NewsApiError> {
    let Some(remaining) = headers
        .get("X-RateLimit-Remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
    else {
        return Ok(());
    };

    if remaining == 0 {
        let reset_at = headers
            .get("X-RateLimit-Reset")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        tracing::error!(reset_at, "NewsAPI rate limit exceeded");
        return Err(NewsApiError::RateLimited { reset_at });
    }

    if remaining < RATE_LIMIT_WARNING {
        tracing::warn!(remaining, "NewsAPI rate limit approaching");
    }

    Ok(())
}

fn headlines_params(query: &HeadlinesQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("pageSize", query.page_size.min(MAX_PAGE_SIZE).to_string())];
    if let Some(country) = &query.country {
        params.push(("country", country.clone()));
    }
    if let Some(category) = &query.category {
        params.push(("category", category.clone()));
    }
    if let Some(q) = &query.query {
        params.push(("q", q.clone()));
    }
    params
}

impl NewsSource for NewsApiClient {
    async fn search(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsApiError> {
        let params = self.everything_params(query);
        self.make_request("everything", &params).await
    }

    async fn top_headlines(&self, query: &HeadlinesQuery) -> Result<Vec<Article>, NewsApiError> {
        let params = headlines_params(query);
        self.make_request("top-headlines", &params).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_article_content(&self, url: &str) -> Option<String> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(CONTENT_TIMEOUT)
            .send()
            .await
            .and_then(|resp| resp.error_for_status().map_err(Into::into))
            .inspect_err(|e| tracing::error!(error = %e, "Error fetching article"))
            .ok()?;

        let html = resp
            .text()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error reading article body"))
            .ok()?;

        let content = extract::extract_article_text(&html);
        if content.is_none() {
            tracing::warn!("No readable content found");
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use reqwest::header::HeaderValue;

    use super::*;
    use crate::news::SortBy;

    fn headers(remaining: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_str(remaining).unwrap());
        headers.insert("X-RateLimit-Reset", HeaderValue::from_static("2025-03-04T00:00:00Z"));
        headers
    }

    #[test]
    fn test_rate_limit_checks() {
        assert!(check_rate_limit(&HeaderMap::new()).is_ok());
        assert!(check_rate_limit(&headers("42")).is_ok());
        assert!(check_rate_limit(&headers("3")).is_ok());
        assert!(matches!(
            check_rate_limit(&headers("0")),
            Err(NewsApiError::RateLimited { reset_at }) if reset_at == "2025-03-04T00:00:00Z"
        ));
    }

    #[test]
    fn test_everything_params_use_default_skip_domains() {
        let client =
            NewsApiClient::new("key").with_skip_domains(vec!["a.com".into(), "b.com".into()]);
        let query = NewsQuery::new("robots")
            .page_size(10)
            .sort_by(SortBy::PublishedAt)
            .from_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let params = client.everything_params(&query);
        assert!(params.contains(&("q", "robots".into())));
        assert!(params.contains(&("pageSize", "10".into())));
        assert!(params.contains(&("sortBy", "publishedAt".into())));
        assert!(params.contains(&("excludeDomains", "a.com,b.com".into())));
        assert!(params.contains(&("from", "2025-03-01".into())));
        assert!(!params.iter().any(|(k, _)| *k == "to"));
    }

    #[test]
    fn test_query_domains_override_defaults() {
        let client = NewsApiClient::new("key");
        let query = NewsQuery::new("robots").exclude_domains(vec!["c.com".into()]);

        let params = client.everything_params(&query);
        assert!(params.contains(&("excludeDomains", "c.com".into())));
    }

    #[test]
    fn test_headlines_params() {
        let query = HeadlinesQuery {
            country: Some("us".into()),
            category: Some("technology".into()),
            query: None,
            page_size: 250,
        };

        let params = headlines_params(&query);
        assert_eq!(
            params,
            vec![
                ("pageSize", "100".to_string()),
                ("country", "us".to_string()),
                ("category", "technology".to_string()),
            ]
        );
        assert!(!params.iter().any(|(k, _)| *k == "excludeDomains"));

        let params = headlines_params(&HeadlinesQuery {
            query: Some("robots".into()),
            ..Default::default()
        });
        assert_eq!(
            params,
            vec![("pageSize", "20".to_string()), ("q", "robots".to_string())]
        );
    }

    #[test]
    fn test_error_body_parses() {
        let body: NewsApiResponse = serde_json::from_str(
            r#"{"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid."}"#,
        )
        .unwrap();
        assert_eq!(body.status, "error");
        assert!(body.articles.is_empty());
        assert_eq!(body.code.as_deref(), Some("apiKeyInvalid"));
    }
}

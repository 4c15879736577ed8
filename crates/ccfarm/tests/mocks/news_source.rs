use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use ccfarm::{
    news::{HeadlinesQuery, NewsApiError, NewsQuery, NewsSource},
    types::{Article, ArticleSource},
};

#[derive(Clone, Default)]
pub struct MockNewsSource {
    pub articles: Vec<Article>,
    pub contents: HashMap<String, String>,
    pub searches: Arc<Mutex<Vec<NewsQuery>>>,
    pub headline_queries: Arc<Mutex<Vec<HeadlinesQuery>>>,
    pub fetched: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

pub fn article(title: &str, url: &str) -> Article {
    Article {
        source: Some(ArticleSource {
            id: None,
            name: Some("The Daily Byte".into()),
        }),
        title: Some(title.to_string()),
        description: Some(format!("All about {title}")),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

impl MockNewsSource {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            ..Default::default()
        }
    }

    pub fn with_content(mut self, url: &str, content: &str) -> Self {
        self.contents.insert(url.to_string(), content.to_string());
        self
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    fn respond(&self) -> Result<Vec<Article>, NewsApiError> {
        if let Some(ref msg) = self.fail_with {
            return Err(NewsApiError::Api {
                code: "apiKeyInvalid".into(),
                message: msg.clone(),
            });
        }
        Ok(self.articles.clone())
    }
}

impl NewsSource for MockNewsSource {
    async fn search(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsApiError> {
        self.searches.lock().unwrap().push(query.clone());
        self.respond()
    }

    async fn top_headlines(&self, query: &HeadlinesQuery) -> Result<Vec<Article>, NewsApiError> {
        self.headline_queries.lock().unwrap().push(query.clone());
        self.respond()
    }

    async fn fetch_article_content(&self, url: &str) -> Option<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.contents.get(url).cloned()
    }
}

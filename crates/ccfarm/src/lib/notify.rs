use reqwest_middleware::ClientWithMiddleware;
use serde_json::{json, Value};

use crate::http;

/// Posts MessageCard notifications to a Microsoft Teams incoming webhook
#[derive(Debug, Clone)]
pub struct TeamsWebhook {
    client: ClientWithMiddleware,
    url: String,
}

impl TeamsWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: http::client_with_retries(1),
            url: url.into(),
        }
    }

    #[tracing::instrument(skip(self, message))]
    pub async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&message_card(title, message))
            .send()
            .await?
            .error_for_status()?;

        tracing::info!("Notification sent successfully");
        Ok(())
    }
}

fn message_card(title: &str, message: &str) -> Value {
    json!({
        "@type": "MessageCard",
        "@context": "http://schema.org/extensions",
        "themeColor": "0076D7",
        "summary": title,
        "sections": [{
            "activityTitle": title,
            "text": message
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_card_shape() {
        let card = message_card("News Scoring", "Found 2 articles");
        assert_eq!(card["@type"], "MessageCard");
        assert_eq!(card["summary"], "News Scoring");
        assert_eq!(card["sections"][0]["activityTitle"], "News Scoring");
        assert_eq!(card["sections"][0]["text"], "Found 2 articles");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_an_error() {
        let webhook = TeamsWebhook::new("http://127.0.0.1:9/webhook");
        assert!(webhook.notify("t", "m").await.is_err());
    }
}

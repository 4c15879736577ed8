pub mod debriefer;
pub mod satirist;
pub mod scout;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::llm::{tagged, CompletionRequest, LanguageModel, LlmError};

/// Bounded exponential backoff applied around model calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    /// Retries without sleeping in between
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Prompt configuration shared by every agent
#[derive(Debug, Clone, Copy)]
pub(crate) struct AgentProfile {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub temperature: f32,
    pub response_tag: &'static str,
    pub response_schema: &'static str,
}

/// Sends `prompt` (with the profile's schema instructions appended) and parses
/// the tagged JSON reply into `T`.
///
/// Transient model failures are retried according to `backoff`, malformed
/// replies are not.
pub(crate) async fn generate_reply<L, T>(
    llm: &L,
    profile: &AgentProfile,
    backoff: &Backoff,
    prompt: &str,
) -> Result<T, LlmError>
where
    L: LanguageModel + Sync,
    T: DeserializeOwned,
{
    let prompt =
        tagged::with_schema_instructions(prompt, profile.response_tag, profile.response_schema);
    let request =
        CompletionRequest::new(profile.system_prompt, prompt).temperature(profile.temperature);

    let mut attempt = 0;
    let content = loop {
        attempt += 1;
        tracing::debug!(agent = profile.name, attempt, "Making LLM call");

        match llm.complete(&request).await {
            Ok(content) => break content,
            Err(e) if e.is_transient() && attempt < backoff.max_attempts => {
                let delay = backoff.delay_for(attempt);
                tracing::warn!(
                    agent = profile.name,
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "LLM call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    };

    Ok(tagged::parse_tagged(&content, profile.response_tag)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(8));
        assert_eq!(backoff.delay_for(10), Duration::from_secs(60));
        assert_eq!(backoff.delay_for(40), Duration::from_secs(60));
    }

    #[test]
    fn test_immediate_backoff_never_sleeps() {
        let backoff = Backoff::immediate(5);
        assert_eq!(backoff.delay_for(3), Duration::ZERO);
        assert_eq!(backoff.max_attempts, 5);
    }
}

//! Human readable summaries of pipeline runs: the markdown scoring report
//! and the short texts sent as notifications.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    processor::BriefOutcome,
    types::{ScoredArticle, VideoScript},
};

pub const SCORING_REPORT_FILE: &str = "news-scoring-results.md";

pub fn scoring_report(articles: &[ScoredArticle]) -> String {
    if articles.is_empty() {
        return "# News Scoring Results\n\nNo articles met the scoring threshold.\n".into();
    }

    let mut markdown = format!(
        "# News Scoring Results\n\nFound {} high-potential comedy articles:\n\n",
        articles.len()
    );

    for (idx, scored) in articles.iter().enumerate() {
        let _ = write!(
            markdown,
            "## {}. {} - Score: {}\n\n**Reason:** {}\n\n",
            idx + 1,
            scored.title(),
            scored.score.score,
            scored.score.reason
        );
        if let Some(description) = scored.article.description.as_deref() {
            let _ = write!(markdown, "**Description:** {description}\n\n");
        }
        if let Some(url) = scored.article.url.as_deref() {
            let _ = write!(markdown, "**Source:** [{url}]({url})\n\n");
        }
        markdown.push_str("---\n\n");
    }

    markdown
}

pub fn scoring_notification(articles: &[ScoredArticle], query: &str) -> String {
    if articles.is_empty() {
        return format!("📰 News scoring complete: No articles met the threshold for query '{query}'");
    }

    let lines = articles
        .iter()
        .enumerate()
        .map(|(idx, scored)| format!("{}. {} - Score: {}", idx + 1, scored.title(), scored.score.score))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "📰 News scoring complete: Found {} articles with comedy potential for query '{query}'\n\n{lines}",
        articles.len()
    )
}

pub fn brief_summary(outcomes: &[BriefOutcome]) -> String {
    if outcomes.is_empty() {
        return "No articles were analyzed in this run".into();
    }

    let mut summary = format!("Analyzed {} articles for comedy content:\n", outcomes.len());
    for (idx, outcome) in outcomes.iter().enumerate() {
        let _ = write!(
            summary,
            "\n{}. {}\n   {}\n   Comedy Potential: {}/10\n",
            idx + 1,
            outcome.title,
            outcome.analysis.summary,
            outcome.analysis.comedy_potential
        );
    }

    summary
}

pub fn script_summary(scripts: &[(i64, VideoScript)]) -> String {
    if scripts.is_empty() {
        return "No scripts were generated in this run".into();
    }

    let mut summary = format!("Generated {} comedy scripts:\n", scripts.len());
    for (idx, (id, script)) in scripts.iter().enumerate() {
        let _ = write!(summary, "\n{}. {}\n   ID: {id}\n   Segments:\n", idx + 1, script.title);
        for segment in &script.segments {
            let preview: String = segment.text.chars().take(80).collect();
            let _ = writeln!(summary, "   {preview}...");
        }
    }

    summary
}

/// Writes `content` to `dir/name`, creating `dir` when needed
pub async fn write_report(dir: &Path, name: &str, content: &str) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

    let path = dir.join(name);
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use ccfarm_datastore::ArticleScore;

    use super::*;
    use crate::types::{Article, ArticleAnalysis, SpeechSegment};

    fn scored(title: &str, score: i64, url: Option<&str>) -> ScoredArticle {
        ScoredArticle {
            article: Article {
                title: Some(title.into()),
                description: Some(format!("{title} description")),
                url: url.map(Into::into),
                ..Default::default()
            },
            score: ArticleScore::new(score, "funny").unwrap(),
        }
    }

    #[test]
    fn test_empty_scoring_report() {
        assert_eq!(
            scoring_report(&[]),
            "# News Scoring Results\n\nNo articles met the scoring threshold.\n"
        );
    }

    #[test]
    fn test_scoring_report_lists_articles() {
        let report = scoring_report(&[
            scored("Robots unionise", 9, Some("https://example.com/robots")),
            scored("Chatbot mayor", 7, None),
        ]);

        assert!(report.contains("Found 2 high-potential comedy articles"));
        assert!(report.contains("## 1. Robots unionise - Score: 9"));
        assert!(report.contains("**Source:** [https://example.com/robots](https://example.com/robots)"));
        assert!(report.contains("## 2. Chatbot mayor - Score: 7"));
        assert_eq!(report.matches("---").count(), 2);
    }

    #[test]
    fn test_scoring_notification() {
        let message = scoring_notification(&[scored("Robots unionise", 9, None)], "robots");
        assert!(message.contains("Found 1 articles with comedy potential for query 'robots'"));
        assert!(message.ends_with("1. Robots unionise - Score: 9"));

        let empty = scoring_notification(&[], "robots");
        assert!(empty.contains("No articles met the threshold"));
    }

    #[test]
    fn test_brief_summary() {
        let outcome = BriefOutcome {
            article_id: "https://example.com/robots".into(),
            title: "Robots unionise".into(),
            analysis: ArticleAnalysis {
                title: "Robots unionise".into(),
                satirical_headlines: None,
                summary: "Robots want oil breaks.".into(),
                core_absurdity: "Machines on strike".into(),
                key_points: None,
                comedy_potential: 8,
                comedy_angles: vec![],
                target_audience: None,
                sensitive_elements: None,
                news_category: "tech".into(),
            },
        };

        let summary = brief_summary(&[outcome]);
        assert!(summary.starts_with("Analyzed 1 articles"));
        assert!(summary.contains("Comedy Potential: 8/10"));
        assert_eq!(brief_summary(&[]), "No articles were analyzed in this run");
    }

    #[test]
    fn test_script_summary() {
        let script = VideoScript {
            title: "Oil Break Uprising".into(),
            description: "d".into(),
            tags: vec![],
            segments: vec![SpeechSegment {
                text: "Breaking news from the factory floor".into(),
                keywords: vec!["robot".into()],
            }],
        };

        let summary = script_summary(&[(42, script)]);
        assert!(summary.contains("1. Oil Break Uprising"));
        assert!(summary.contains("ID: 42"));
        assert!(summary.contains("   Breaking news from the factory floor..."));
    }

    #[tokio::test]
    async fn test_write_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");

        let path = write_report(&reports, SCORING_REPORT_FILE, "# hi\n").await.unwrap();
        assert_eq!(path, reports.join(SCORING_REPORT_FILE));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hi\n");
    }
}

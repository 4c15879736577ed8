use std::sync::LazyLock;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};

static ARTICLE_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article p").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static CLASSED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[class]").unwrap());

/// Elements whose text never belongs to the article body
const BOILERPLATE: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

/// Extracts the readable body text of a news page.
///
/// Looks at `<article>` paragraphs first, then at the first element whose
/// class mentions `article` or `content`, then at every paragraph of the page.
pub fn extract_article_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let from_article = join_paragraphs(document.select(&ARTICLE_PARAGRAPHS));
    if from_article.is_some() {
        return from_article;
    }

    let content_block = document
        .select(&CLASSED)
        .filter(|el| !is_boilerplate(el))
        .find(|el| {
            el.value().classes().any(|class| {
                let class = class.to_lowercase();
                class.contains("article") || class.contains("content")
            })
        });

    if let Some(block) = content_block {
        let text = join_paragraphs(block.select(&PARAGRAPHS)).or_else(|| element_text(&block));
        if text.is_some() {
            return text;
        }
    }

    join_paragraphs(document.select(&PARAGRAPHS))
}

fn is_boilerplate(element: &ElementRef) -> bool {
    BOILERPLATE.contains(&element.value().name())
        || element.ancestors().any(|node| {
            node.value()
                .as_element()
                .is_some_and(|el| BOILERPLATE.contains(&el.name()))
        })
}

/// Text of `element` without the text of any boilerplate descendants
fn element_text(element: &ElementRef) -> Option<String> {
    let text = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let inside_boilerplate = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| BOILERPLATE.contains(&el.name()))
            });
            (!inside_boilerplate).then_some(&**text)
        })
        .collect::<String>();

    normalize(&text)
}

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> Option<String> {
    let text = paragraphs
        .filter(|p| !is_boilerplate(p))
        .filter_map(|p| element_text(&p))
        .join("\n\n");

    (!text.is_empty()).then_some(text)
}

fn normalize(text: &str) -> Option<String> {
    let text = text.split_whitespace().join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article_paragraphs() {
        let html = r#"
            <html><body>
              <header><p>Subscribe now!</p></header>
              <article>
                <h1>Robots unionise</h1>
                <p>Factory robots   demanded oil breaks.</p>
                <aside><p>Related: toasters</p></aside>
                <p>Management is <b>baffled</b>.</p>
              </article>
              <footer><p>Copyright</p></footer>
            </body></html>
        "#;

        assert_eq!(
            extract_article_text(html).as_deref(),
            Some("Factory robots demanded oil breaks.\n\nManagement is baffled.")
        );
    }

    #[test]
    fn test_falls_back_to_content_class() {
        let html = r#"
            <html><body>
              <nav class="nav-content">Home | News</nav>
              <div class="Main-Content">
                Chatbot elected mayor.
                <script>track()</script>
                Voters unsure.
              </div>
            </body></html>
        "#;

        assert_eq!(
            extract_article_text(html).as_deref(),
            Some("Chatbot elected mayor. Voters unsure.")
        );
    }

    #[test]
    fn test_falls_back_to_all_paragraphs() {
        let html = "<html><body><div><p>One.</p></div><footer><p>Legal</p></footer><p>Two.</p></body></html>";
        assert_eq!(extract_article_text(html).as_deref(), Some("One.\n\nTwo."));
    }

    #[test]
    fn test_empty_page_yields_none() {
        assert!(extract_article_text("<html><body><nav><p>menu</p></nav></body></html>").is_none());
        assert!(extract_article_text("").is_none());
    }
}

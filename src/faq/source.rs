//! Remote FAQ table scraped from the shop's FAQ page.
//!
//! The page uses the Bootstrap accordion layout: each entry is an
//! `accordion-item` holding an `accordion-button` (question) and an
//! `accordion-body` (answer).

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use super::FaqEntry;
use crate::markup::to_plain_line;

#[derive(Debug, Error)]
pub enum FaqFetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected page content: {0}")]
    Parse(String),
}

/// Anything that can produce FAQ entries on demand.
pub trait FaqSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<FaqEntry>, FaqFetchError>;
}

/// Fetches and parses an accordion FAQ page over HTTP.
pub struct HttpFaqSource {
    url: String,
    timeout: Duration,
}

impl HttpFaqSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl FaqSource for HttpFaqSource {
    fn fetch(&self) -> Result<Vec<FaqEntry>, FaqFetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let body = client
            .get(&self.url)
            .send()?
            .error_for_status()?
            .text()?;

        let entries = parse_accordion(&body);
        if entries.is_empty() {
            return Err(FaqFetchError::Parse(format!("no accordion items at {}", self.url)));
        }
        tracing::info!(url = %self.url, count = entries.len(), "parsed FAQ page");
        Ok(entries)
    }
}

struct AccordionPatterns {
    item: Regex,
    button: Regex,
    body: Regex,
}

fn patterns() -> &'static AccordionPatterns {
    static PATTERNS: OnceLock<AccordionPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| AccordionPatterns {
        item: Regex::new(r#"<[a-zA-Z]+[^>]*class\s*=\s*["'][^"']*\baccordion-item\b[^"']*["'][^>]*>"#).unwrap(),
        button: Regex::new(r#"(?s)<[a-zA-Z]+[^>]*class\s*=\s*["'][^"']*\baccordion-button\b[^"']*["'][^>]*>(.*?)</"#)
            .unwrap(),
        body: Regex::new(r#"(?s)<[a-zA-Z]+[^>]*class\s*=\s*["'][^"']*\baccordion-body\b[^"']*["'][^>]*>(.*)"#).unwrap(),
    })
}

/// Extracts question/answer pairs from accordion markup.
///
/// Items missing either part, or whose text is blank, are skipped.
pub fn parse_accordion(html: &str) -> Vec<FaqEntry> {
    let p = patterns();
    let starts: Vec<usize> = p.item.find_iter(html).map(|m| m.start()).collect();

    let mut entries = Vec::new();
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(html.len());
        let item = &html[*start..end];

        let question = p.button.captures(item).map(|c| to_plain_line(&c[1]));
        let answer = p.body.captures(item).map(|c| to_plain_line(&c[1]));
        if let (Some(question), Some(answer)) = (question, answer) {
            if !question.is_empty() && !answer.is_empty() {
                entries.push(FaqEntry { question, answer });
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="accordion" id="faq">
  <div class="accordion-item">
    <h2 class="accordion-header">
      <button class="accordion-button collapsed" type="button">
        Do you ship to Ghana?
      </button>
    </h2>
    <div class="accordion-collapse collapse">
      <div class="accordion-body">
        <p>Yes &amp; it takes <strong>5 days</strong>.</p>
      </div>
    </div>
  </div>
  <div class="accordion-item">
    <h2 class="accordion-header"><button class="accordion-button">Store hours</button></h2>
    <div class="accordion-body">Mon&ndash;Sat</div>
  </div>
  <div class="accordion-item">
    <h2 class="accordion-header"><button class="accordion-button">Orphan question</button></h2>
  </div>
</div>"#;

    #[test]
    fn parses_accordion_items() {
        let entries = parse_accordion(PAGE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question, "Do you ship to Ghana?");
        assert_eq!(entries[0].answer, "Yes & it takes 5 days.");
        assert_eq!(entries[1].question, "Store hours");
        assert_eq!(entries[1].answer, "Mon–Sat");
    }

    #[test]
    fn items_without_answer_are_skipped() {
        let entries = parse_accordion(PAGE);
        assert!(entries.iter().all(|e| e.question != "Orphan question"));
    }

    #[test]
    fn page_without_accordion_is_empty() {
        assert!(parse_accordion("<html><body><p>Coming soon</p></body></html>").is_empty());
    }

    #[test]
    fn invalid_url_is_an_error() {
        let source = HttpFaqSource::new("not a url", Duration::from_millis(200));
        assert!(matches!(source.fetch(), Err(FaqFetchError::Http(_))));
    }
}

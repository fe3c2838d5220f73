/// Articles from the organization's RSS feed, normalized for the app.
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use chrono::DateTime;
use regex::Regex;
use rss::Channel;
use scorecard_common::upstream::UpstreamClient;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AppError;

const DEFAULT_AUTHOR: &str = "NIAC";
const FEED_TTL: Duration = Duration::from_secs(300);
const SNIPPET_CHARS: usize = 300;
const SLUG_CHARS: usize = 50;

static SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/p/([^/?]+)").expect("valid regex"));
static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("valid regex"));
static SUBTITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<p[^>]*class="[^"]*subtitle[^"]*"[^>]*>([^<]+)</p>"#).expect("valid regex")
});
static FIRST_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<p[^>]*>([^<]{20,200})").expect("valid regex"));
static FIRST_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub pub_date: String,
    /// `pub_date` as RFC 3339, when it parses.
    pub published_at: Option<String>,
    pub content: String,
    pub content_snippet: String,
    pub link: String,
    pub image_url: String,
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Post slug from `/p/<slug>` links, otherwise a sanitized prefix of the link.
pub fn article_id(link: &str) -> String {
    match SLUG.captures(link) {
        Some(c) => c[1].to_string(),
        None => truncate_chars(&NON_ALNUM.replace_all(link, "-"), SLUG_CHARS),
    }
}

pub fn strip_html(html: &str) -> String {
    let text = TAG.replace_all(html, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn subtitle(content: &str) -> String {
    if let Some(c) = SUBTITLE.captures(content) {
        return c[1].trim().to_string();
    }
    let Some(c) = FIRST_PARAGRAPH.captures(content) else {
        return String::new();
    };
    let text = c[1].trim();
    if text.chars().count() > 150 {
        format!("{}...", truncate_chars(text, 147))
    } else {
        text.to_string()
    }
}

fn image_url(item: &rss::Item, content: &str) -> String {
    if let Some(enclosure) = item.enclosure().filter(|e| !e.url().is_empty()) {
        return enclosure.url().to_string();
    }
    let media = item
        .extensions()
        .get("media")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.first())
        .and_then(|c| c.attrs().get("url"));
    if let Some(url) = media {
        return url.clone();
    }
    FIRST_IMAGE
        .captures(content)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

fn to_article(item: &rss::Item) -> Article {
    let content = item
        .content()
        .or_else(|| item.description())
        .unwrap_or_default()
        .to_string();
    let link = item.link().unwrap_or_default().to_string();
    let pub_date = item.pub_date().unwrap_or_default().to_string();
    let author = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first().cloned())
        .or_else(|| item.author().map(str::to_string))
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

    Article {
        id: article_id(&link),
        title: item.title().unwrap_or_default().to_string(),
        subtitle: subtitle(&content),
        author,
        published_at: DateTime::parse_from_rfc2822(pub_date.trim())
            .ok()
            .map(|d| d.to_rfc3339()),
        pub_date,
        content_snippet: truncate_chars(&strip_html(&content), SNIPPET_CHARS),
        image_url: image_url(item, &content),
        link,
        content,
    }
}

pub fn parse_feed(xml: &str) -> Result<Vec<Article>, AppError> {
    let channel = Channel::read_from(xml.as_bytes())?;
    Ok(channel.items().iter().map(to_article).collect())
}

/// Feed articles, re-fetched at most every five minutes.
#[derive(Default)]
pub struct NewsCache {
    entry: Mutex<Option<(Instant, Arc<Vec<Article>>)>>,
}

impl NewsCache {
    pub async fn articles(&self, client: &UpstreamClient) -> Result<Arc<Vec<Article>>, AppError> {
        let mut entry = self.entry.lock().await;
        if let Some((fetched_at, articles)) = entry.as_ref() {
            if fetched_at.elapsed() < FEED_TTL {
                return Ok(Arc::clone(articles));
            }
        }
        let xml = client.get_text(&client.config().news_feed_url).await?;
        let articles = Arc::new(parse_feed(&xml)?);
        debug!(articles = articles.len(), "news feed refreshed");
        *entry = Some((Instant::now(), Arc::clone(&articles)));
        Ok(articles)
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum NewsResponse {
    List { articles: Vec<Article> },
    Single { article: Article },
}

/// All articles, or the one whose id is `id`.
pub fn select(articles: &[Article], id: Option<&str>) -> Result<NewsResponse, AppError> {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        None => Ok(NewsResponse::List {
            articles: articles.to_vec(),
        }),
        Some(id) => articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .map(|article| NewsResponse::Single { article })
            .ok_or_else(|| AppError::NotFound("Article not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Insights</title>
    <link>https://insights.example.org</link>
    <description>Analysis</description>
    <item>
      <title>Sanctions Week in Review</title>
      <link>https://insights.example.org/p/sanctions-week-in-review</link>
      <pubDate>Tue, 03 Jun 2025 14:30:00 GMT</pubDate>
      <dc:creator>Ann Writer</dc:creator>
      <enclosure url="https://cdn.example.org/cover.jpg" length="0" type="image/jpeg"/>
      <content:encoded><![CDATA[<p class="post-subtitle">What changed this week</p><p>Congress   moved on <b>three</b> bills.</p>]]></content:encoded>
    </item>
    <item>
      <title>Letter to Congress</title>
      <link>https://example.org/letters?id=7</link>
      <description><![CDATA[<p>This paragraph is long enough to be the subtitle of the post.</p><img src="https://cdn.example.org/inline.png">]]></description>
    </item>
    <item>
      <title>Media Item</title>
      <link>https://insights.example.org/p/media-item?utm=rss</link>
      <media:content url="https://cdn.example.org/media.jpg" medium="image"/>
      <description>short</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn ids_from_links() {
        assert_eq!(article_id("https://x.org/p/hello-world"), "hello-world");
        assert_eq!(article_id("https://x.org/p/hello?utm=1"), "hello");
        assert_eq!(article_id("a.b/c"), "a-b-c");
        assert_eq!(article_id(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn html_is_flattened() {
        assert_eq!(strip_html("<p>One\n\n <i>two</i></p>  "), "One two");
    }

    #[test]
    fn feed_items_are_normalized() {
        let articles = parse_feed(FEED).unwrap();
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.id, "sanctions-week-in-review");
        assert_eq!(first.subtitle, "What changed this week");
        assert_eq!(first.author, "Ann Writer");
        assert_eq!(first.image_url, "https://cdn.example.org/cover.jpg");
        assert_eq!(
            first.content_snippet,
            "What changed this weekCongress moved on three bills."
        );
        assert_eq!(
            first.published_at.as_deref(),
            Some("2025-06-03T14:30:00+00:00")
        );

        let second = &articles[1];
        assert_eq!(second.id, "https---example-org-letters-id-7");
        assert_eq!(second.author, "NIAC");
        assert_eq!(
            second.subtitle,
            "This paragraph is long enough to be the subtitle of the post."
        );
        assert_eq!(second.image_url, "https://cdn.example.org/inline.png");
        assert_eq!(second.published_at, None);

        let third = &articles[2];
        assert_eq!(third.id, "media-item");
        assert_eq!(third.image_url, "https://cdn.example.org/media.jpg");
        assert_eq!(third.subtitle, "");
    }

    #[test]
    fn select_by_id() {
        let articles = parse_feed(FEED).unwrap();
        match select(&articles, Some("media-item")).unwrap() {
            NewsResponse::Single { article } => assert_eq!(article.title, "Media Item"),
            other => panic!("expected single article, got {other:?}"),
        }
        match select(&articles, None).unwrap() {
            NewsResponse::List { articles } => assert_eq!(articles.len(), 3),
            other => panic!("expected list, got {other:?}"),
        }
        let err = select(&articles, Some("missing")).unwrap_err();
        assert_eq!(err.to_string(), "Article not found");
    }

    #[test]
    fn malformed_feed_is_an_error() {
        assert!(matches!(parse_feed("not xml"), Err(AppError::Feed(_))));
    }
}

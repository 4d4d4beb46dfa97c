//! Поиск ссылки «смотреть онлайн» для фильма.
//!
//! Вызывающий код видит только [`LinkFinder`]: сейчас за ним стоит разбор
//! выдачи Google, но его можно выключить или заменить, не трогая бота.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{pin_mut, Stream, StreamExt};
use moka::future::Cache;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, Url};
use scraper::{ElementRef, Html, Selector};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no link found")]
    NoLink,
}

#[async_trait]
pub trait LinkFinder: Send + Sync {
    /// Первая живая ссылка для просмотра фильма `title`.
    async fn find_watch_link(&self, title: &str) -> Result<String, SearchError>;
}

/// Поиск выключен: ссылки нет никогда.
pub struct NoLinkFinder;

#[async_trait]
impl LinkFinder for NoLinkFinder {
    async fn find_watch_link(&self, _title: &str) -> Result<String, SearchError> {
        Err(SearchError::NoLink)
    }
}

#[derive(Clone)]
pub struct GoogleSearch {
    http: Client,
    base_url: String,
    lang: String,
    sleep_interval: Duration,
    timeout: Duration,
}

impl GoogleSearch {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        lang: impl Into<String>,
        sleep_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            lang: lang.into(),
            sleep_interval,
            timeout,
        }
    }

    /// Лениво отдаёт до `num_results` живых ссылок из выдачи.
    /// Страницы листаются через `start`; страница без единой принятой ссылки
    /// завершает поиск.
    pub fn search<'a>(
        &'a self,
        term: &'a str,
        num_results: usize,
    ) -> impl Stream<Item = Result<String, SearchError>> + Send + 'a {
        try_stream! {
            let mut start = 0;
            while start < num_results {
                let page = self.fetch_page(term, num_results - start, start).await?;
                let mut accepted = 0;
                for link in parse_results(&page) {
                    if start >= num_results {
                        break;
                    }
                    if !self.is_alive(&link).await {
                        continue;
                    }
                    start += 1;
                    accepted += 1;
                    yield link;
                }
                if accepted == 0 {
                    break;
                }
                if start < num_results && !self.sleep_interval.is_zero() {
                    tokio::time::sleep(self.sleep_interval).await;
                }
            }
        }
    }

    async fn fetch_page(&self, term: &str, results: usize, start: usize) -> Result<String, SearchError> {
        // +2 чтобы отсеянные результаты не требовали лишней страницы
        let url = format!(
            "{}?q={}&num={}&hl={}&start={}",
            self.base_url,
            urlencoding::encode(term),
            results + 2,
            urlencoding::encode(&self.lang),
            start
        );
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }

    async fn is_alive(&self, link: &str) -> bool {
        match self.http.get(link).timeout(self.timeout).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => true,
            Ok(resp) => {
                tracing::debug!(link, status = %resp.status(), "skipping search result");
                false
            }
            Err(e) => {
                tracing::debug!(link, error = %e, "skipping unreachable search result");
                false
            }
        }
    }
}

#[async_trait]
impl LinkFinder for GoogleSearch {
    async fn find_watch_link(&self, title: &str) -> Result<String, SearchError> {
        let term = format!("{title} +смотреть+онлайн");
        let results = self.search(&term, 1);
        pin_mut!(results);
        results.next().await.unwrap_or(Err(SearchError::NoLink))
    }
}

/// Кэширует найденные ссылки по названию; неудачи не кэшируются.
pub struct CachedLinkFinder {
    inner: Arc<dyn LinkFinder>,
    cache: Cache<String, String>,
}

impl CachedLinkFinder {
    pub fn new(inner: Arc<dyn LinkFinder>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(10_000).time_to_live(ttl).build();
        Self { inner, cache }
    }
}

#[async_trait]
impl LinkFinder for CachedLinkFinder {
    async fn find_watch_link(&self, title: &str) -> Result<String, SearchError> {
        let key = title.to_lowercase();
        if let Some(link) = self.cache.get(&key).await {
            return Ok(link);
        }
        let link = self.inner.find_watch_link(title).await?;
        self.cache.insert(key, link.clone()).await;
        Ok(link)
    }
}

/* ====== Разбор выдачи ====== */

static RESULT_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.g").expect("static selector"));
static RESULT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static RESULT_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("static selector"));
static RESULT_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[style="-webkit-line-clamp:2"]"#).expect("static selector")
});

/// Ссылки результатов, у которых есть заголовок и блок описания, в порядке выдачи.
fn parse_results(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();
    for block in document.select(&RESULT_BLOCK) {
        let Some(href) = block.select(&RESULT_LINK).next().and_then(|a| a.value().attr("href")) else {
            continue;
        };
        let Some(link) = resolve_href(href) else { continue };
        if !has_text(block, &RESULT_TITLE) || !has_text(block, &RESULT_DESCRIPTION) {
            continue;
        }
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

fn has_text(block: ElementRef<'_>, selector: &Selector) -> bool {
    block
        .select(selector)
        .next()
        .is_some_and(|e| !e.text().collect::<String>().trim().is_empty())
}

// "/url?q=<target>&..." -> target; относительные ссылки без q отбрасываем
fn resolve_href(href: &str) -> Option<String> {
    if href.starts_with("/url?") {
        let url = Url::parse("https://www.google.com").ok()?.join(href).ok()?;
        let target = url.query_pairs().find(|(k, _)| k == "q")?.1.into_owned();
        return resolve_href(&target);
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        Some(href.to_string())
    } else {
        None
    }
}

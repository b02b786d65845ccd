//! NewsAPI headline provider.
//!
//! Queries the `/v2/everything` endpoint sorted by publication time. The API
//! key travels in the `X-Api-Key` header, never in the URL.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::http::build_client;
use super::provider::{NewsProvider, ProviderError};
use crate::config::NewsConfig;
use crate::domain::Headline;

/// Title NewsAPI substitutes for articles pulled by the publisher.
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

pub struct NewsApiProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsApiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://newsapi.org";

    /// A provider with no key still constructs; every fetch then fails with
    /// [`ProviderError::AuthenticationRequired`].
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse_response(
        resp: EverythingResponse,
        limit: usize,
    ) -> Result<Vec<Headline>, ProviderError> {
        if resp.status != "ok" {
            let code = resp.code.unwrap_or_default();
            let message = resp.message.unwrap_or_else(|| "no message".into());
            return Err(match code.as_str() {
                "apiKeyInvalid" | "apiKeyMissing" | "apiKeyDisabled" | "apiKeyExhausted" => {
                    ProviderError::AuthenticationRequired(message)
                }
                "rateLimited" => ProviderError::RateLimited {
                    retry_after_secs: 3600,
                },
                _ => ProviderError::Other(format!("newsapi {code}: {message}")),
            });
        }

        let headlines = resp
            .articles
            .into_iter()
            .filter_map(|a| {
                let title = a.title?.trim().to_string();
                if title.is_empty() || title == REMOVED_MARKER {
                    return None;
                }
                let source = a
                    .source
                    .and_then(|s| s.name)
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".into());
                let published_at = a
                    .published_at
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                Some(Headline {
                    title,
                    source,
                    url: a.url,
                    published_at,
                })
            })
            .take(limit)
            .collect();
        Ok(headlines)
    }
}

impl NewsProvider for NewsApiProvider {
    fn name(&self) -> &str {
        "newsapi"
    }

    fn fetch_headlines(
        &self,
        query: &NewsConfig,
        until: NaiveDate,
    ) -> Result<Vec<Headline>, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::AuthenticationRequired("no NewsAPI key configured".into())
        })?;

        let url = format!("{}/v2/everything", self.base_url);
        let to = until.format("%Y-%m-%d").to_string();
        let page_size = query.page_size.to_string();
        log::debug!("newsapi: query {:?} up to {to}", query.query);

        // NewsAPI reports auth and quota problems in the JSON body with a
        // non-2xx status, so the body is parsed before the status is judged.
        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", key)
            .query(&[
                ("q", query.query.as_str()),
                ("pageSize", page_size.as_str()),
                ("language", query.language.as_str()),
                ("sortBy", "publishedAt"),
                ("to", to.as_str()),
            ])
            .send()?;
        let status = resp.status();
        let body: EverythingResponse = resp.json().map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "newsapi HTTP {status}: {}",
                e.without_url()
            ))
        })?;
        Self::parse_response(body, query.page_size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, limit: usize) -> Result<Vec<Headline>, ProviderError> {
        let resp: EverythingResponse = serde_json::from_str(json).unwrap();
        NewsApiProvider::parse_response(resp, limit)
    }

    #[test]
    fn parses_articles_and_skips_removed() {
        let json = r#"{"status":"ok","totalResults":3,"articles":[
            {"source":{"id":null,"name":"Mint"},"title":"Sensex climbs 500 points","url":"https://example.com/a","publishedAt":"2024-10-16T09:30:00Z"},
            {"source":{"id":null,"name":"[Removed]"},"title":"[Removed]","url":"https://removed.com","publishedAt":"1970-01-01T00:00:00Z"},
            {"source":{"name":null},"title":"Rupee steady","url":null,"publishedAt":"not a date"}
        ]}"#;
        let h = parse(json, 10).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].source, "Mint");
        assert!(h[0].published_at.is_some());
        assert_eq!(h[1].source, "Unknown");
        assert!(h[1].published_at.is_none());
    }

    #[test]
    fn truncates_to_page_size() {
        let json = r#"{"status":"ok","articles":[
            {"title":"a"},{"title":"b"},{"title":"c"}
        ]}"#;
        assert_eq!(parse(json, 2).unwrap().len(), 2);
    }

    #[test]
    fn invalid_key_is_auth_error() {
        let json = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#;
        assert!(matches!(
            parse(json, 6),
            Err(ProviderError::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn rate_limit_is_mapped() {
        let json = r#"{"status":"error","code":"rateLimited","message":"too many"}"#;
        assert!(matches!(
            parse(json, 6),
            Err(ProviderError::RateLimited { .. })
        ));
    }

    #[test]
    fn missing_key_fails_without_request() {
        let p = NewsApiProvider::new(None, Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let until = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();
        let err = p.fetch_headlines(&NewsConfig::default(), until).unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationRequired(_)));
    }
}

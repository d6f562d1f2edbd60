//! Remote retrieval of the two category sheets.

use async_trait::async_trait;
use std::time::Duration;

use crate::index::Category;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no source URL configured for {category}")]
    Unconfigured { category: Category },

    #[error("{category} source returned HTTP {status}")]
    Status { category: Category, status: u16 },

    #[error("{category} source request failed: {message}")]
    Transport { category: Category, message: String },
}

impl FetchError {
    pub fn category(&self) -> Category {
        match self {
            FetchError::Unconfigured { category }
            | FetchError::Status { category, .. }
            | FetchError::Transport { category, .. } => *category,
        }
    }
}

/// Anything that can hand back the raw sheet text for a category.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch(&self, category: Category) -> Result<String, FetchError>;
}

/// Raw text of both sheets from one successful joint retrieval.
#[derive(Debug, Clone)]
pub struct FetchedPair {
    pub primary: String,
    pub secondary: String,
}

/// Issues both retrievals concurrently and waits for both to settle.
///
/// A failure on either side fails the pair; the other body is discarded.
pub async fn fetch_both<S: TextSource + ?Sized>(source: &S) -> Result<FetchedPair, Vec<FetchError>> {
    let (primary, secondary) = tokio::join!(
        source.fetch(Category::Primary),
        source.fetch(Category::Secondary)
    );

    match (primary, secondary) {
        (Ok(primary), Ok(secondary)) => Ok(FetchedPair { primary, secondary }),
        (primary, secondary) => Err([primary.err(), secondary.err()]
            .into_iter()
            .flatten()
            .collect()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceUrls {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl SourceUrls {
    pub fn get(&self, category: Category) -> Option<&str> {
        match category {
            Category::Primary => self.primary.as_deref(),
            Category::Secondary => self.secondary.as_deref(),
        }
    }
}

/// Plain HTTP GET per category. Any non-2xx status counts as a failure.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    urls: SourceUrls,
}

impl HttpSource {
    pub fn new(urls: SourceUrls, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("pair-finder/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, urls })
    }
}

#[async_trait]
impl TextSource for HttpSource {
    async fn fetch(&self, category: Category) -> Result<String, FetchError> {
        let url = self
            .urls
            .get(category)
            .ok_or(FetchError::Unconfigured { category })?;

        tracing::debug!(%category, url, "fetching sheet");
        let transport = |err: reqwest::Error| FetchError::Transport {
            category,
            message: err.to_string(),
        };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                category,
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned {
        primary: Result<&'static str, u16>,
        secondary: Result<&'static str, u16>,
    }

    #[async_trait]
    impl TextSource for Canned {
        async fn fetch(&self, category: Category) -> Result<String, FetchError> {
            let slot = match category {
                Category::Primary => self.primary,
                Category::Secondary => self.secondary,
            };
            slot.map(str::to_string)
                .map_err(|status| FetchError::Status { category, status })
        }
    }

    #[tokio::test]
    async fn fetch_both_returns_both_bodies() {
        let source = Canned {
            primary: Ok("AB\tx\n"),
            secondary: Ok("CD\ty\n"),
        };
        let pair = fetch_both(&source).await.unwrap();
        assert_eq!(pair.primary, "AB\tx\n");
        assert_eq!(pair.secondary, "CD\ty\n");
    }

    #[tokio::test]
    async fn one_failure_fails_the_pair() {
        let source = Canned {
            primary: Ok("AB\tx\n"),
            secondary: Err(503),
        };
        let errors = fetch_both(&source).await.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category(), Category::Secondary);
    }

    #[tokio::test]
    async fn both_failures_are_reported() {
        let source = Canned {
            primary: Err(404),
            secondary: Err(500),
        };
        let errors = fetch_both(&source).await.unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn http_source_without_url_is_unconfigured() -> anyhow::Result<()> {
        let source = HttpSource::new(SourceUrls::default(), Duration::from_secs(1))?;
        let err = source.fetch(Category::Primary).await.unwrap_err();
        assert!(matches!(err, FetchError::Unconfigured { category: Category::Primary }));
        Ok(())
    }
}

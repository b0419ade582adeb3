//! Page-at-a-time access to collection resources
//!
//! [`PageFetcher`] is the single seam between the traversal logic and the
//! network. [`PageWalker`] drives it across `links.next` continuations:
//! query parameters go out with the first request only, since the
//! continuation URL already carries them.

use crate::error::Result;
use crate::models::{Document, Resource};
use async_trait::async_trait;
use url::Url;

/// One page of a collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Page items in server order
    pub items: Vec<Resource>,
    /// Side-loaded resources shipped with this page
    pub included: Vec<Resource>,
    /// Continuation URL, `None` on the last page
    pub next: Option<Url>,
}

impl Page {
    /// Build a page from a decoded document
    pub fn from_document(document: Document) -> Result<Self> {
        let next = match document.links.next.as_deref() {
            Some(raw) if !raw.is_empty() => Some(Url::parse(raw)?),
            _ => None,
        };

        Ok(Self {
            items: document.data.into_vec(),
            included: document.included,
            next,
        })
    }
}

/// Retrieves single pages of collection resources
///
/// Any non-success response is an error for the whole operation; there is
/// no retry and no partial page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Absolute URL of an API path such as `service_types/1/plans`
    fn endpoint(&self, path: &str) -> Result<Url>;

    /// Fetch one page
    async fn fetch(&self, url: Url, query: &[(&str, &str)]) -> Result<Page>;
}

/// Sequential cursor over the pages of one collection
pub struct PageWalker<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    next: Option<Url>,
    query: Vec<(&'a str, &'a str)>,
    pages_fetched: usize,
}

impl<'a, F: PageFetcher + ?Sized> PageWalker<'a, F> {
    /// Start a traversal at `path` with first-request `query` parameters
    pub fn new(fetcher: &'a F, path: &str, query: &[(&'a str, &'a str)]) -> Result<Self> {
        Ok(Self {
            next: Some(fetcher.endpoint(path)?),
            fetcher,
            query: query.to_vec(),
            pages_fetched: 0,
        })
    }

    /// Fetch the following page, `None` once the collection is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        let query = std::mem::take(&mut self.query);
        let page = self.fetcher.fetch(url, &query).await?;

        self.pages_fetched += 1;
        self.next = page.next.clone();
        tracing::debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            more = self.next.is_some(),
            "Fetched page"
        );

        Ok(Some(page))
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch every remaining page, concatenating items and included resources
    pub async fn collect_all(mut self) -> Result<Page> {
        let mut all = Page::default();
        while let Some(page) = self.next_page().await? {
            all.items.extend(page.items);
            all.included.extend(page.included);
        }
        Ok(all)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher used by unit tests across the crate

    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub const BASE: &str = "https://api.test/services/v2";

    /// Serves canned pages keyed by URL path (query strings ignored)
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, Page>,
        pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn url(path: &str) -> Url {
            Url::parse(&format!("{}/{}", BASE, path)).unwrap()
        }

        pub fn page(mut self, path: &str, items: Vec<Resource>, next: Option<&str>) -> Self {
            self.pages.insert(
                Self::url(path).path().to_string(),
                Page {
                    items,
                    included: Vec::new(),
                    next: next.map(Self::url),
                },
            );
            self
        }

        pub fn page_with_included(
            mut self,
            path: &str,
            items: Vec<Resource>,
            included: Vec<Resource>,
            next: Option<&str>,
        ) -> Self {
            self.pages.insert(
                Self::url(path).path().to_string(),
                Page {
                    items,
                    included,
                    next: next.map(Self::url),
                },
            );
            self
        }

        pub fn requested_paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(path, _)| path.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        fn endpoint(&self, path: &str) -> Result<Url> {
            Ok(Self::url(path))
        }

        async fn fetch(&self, url: Url, query: &[(&str, &str)]) -> Result<Page> {
            self.requests.lock().unwrap().push((
                url.path().to_string(),
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            self.pages.get(url.path()).cloned().ok_or(Error::Transport {
                status: reqwest::StatusCode::NOT_FOUND,
                url: url.to_string(),
            })
        }
    }
}

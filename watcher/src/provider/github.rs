//! GitHub issue search through the `gh` CLI

use std::future::Future;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::IssueProvider;
use crate::error::ProviderError;
use crate::gh::execute_gh_api;
use crate::types::{Issue, Repository};

/// GitHub never returns more than this many search results for one query
const SEARCH_RESULT_CEILING: u32 = 1000;

/// Search page as returned by `GET /search/issues`
#[derive(Debug, Deserialize)]
struct SearchPage {
    total_count: u32,
    #[serde(default)]
    incomplete_results: bool,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    repository_url: String,
}

/// [`IssueProvider`] backed by `gh api search/issues`
///
/// Authentication and host selection are left to `gh` itself, so GitHub
/// Enterprise works with the same `gh auth login` the rest of the tooling uses.
#[derive(Debug, Clone)]
pub struct GhIssueProvider {
    hostname: Option<String>,
    page_size: u32,
}

impl GhIssueProvider {
    pub fn new(hostname: Option<String>, page_size: u32) -> Self {
        Self {
            hostname,
            page_size: page_size.clamp(1, 100),
        }
    }

    async fn fetch_page(&self, query: &str, page: u32) -> Result<SearchPage, ProviderError> {
        let fields = [
            ("q", query.to_string()),
            ("per_page", self.page_size.to_string()),
            ("page", page.to_string()),
        ];
        let page = execute_gh_api(self.hostname.as_deref(), "search/issues", &fields).await?;
        Ok(page)
    }
}

#[async_trait]
impl IssueProvider for GhIssueProvider {
    #[instrument(skip(self), fields(page_size = self.page_size))]
    async fn find(&self, query: &str) -> Result<Vec<Issue>, ProviderError> {
        collect_pages(self.page_size, |page| self.fetch_page(query, page)).await
    }
}

/// Walk search pages until a short page, `total_count`, or the result ceiling.
///
/// A page flagged `incomplete_results` fails the whole search with
/// [`ProviderError::Incomplete`].
async fn collect_pages<F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<Issue>, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<SearchPage, ProviderError>>,
{
    let mut issues = Vec::new();
    let mut seen = 0u32;
    let mut page = 1u32;

    loop {
        let result = fetch(page).await?;
        let fetched = result.items.len() as u32;
        seen += fetched;
        debug!(page, fetched, total = result.total_count, "fetched search page");

        if result.incomplete_results {
            return Err(ProviderError::Incomplete {
                total: result.total_count,
                fetched: seen,
            });
        }

        issues.extend(result.items.into_iter().filter_map(into_issue));

        if fetched < page_size || seen >= result.total_count {
            break;
        }
        if page * page_size >= SEARCH_RESULT_CEILING {
            warn!(
                total = result.total_count,
                fetched = seen,
                "search result ceiling reached, oldest issues in this window are not included"
            );
            break;
        }
        page += 1;
    }

    Ok(issues)
}

fn into_issue(item: SearchItem) -> Option<Issue> {
    let Some(repository) = repository_of(&item) else {
        warn!(title = %item.title, repository_url = %item.repository_url, "skipping issue with unresolvable repository");
        return None;
    };
    Some(Issue {
        title: item.title,
        body: item.body.unwrap_or_default(),
        url: item.html_url,
        repository,
    })
}

/// Resolve the repository from the API URL (`.../repos/{owner}/{name}`)
/// and the issue's web URL (`{repo web url}/issues/{n}`)
fn repository_of(item: &SearchItem) -> Option<Repository> {
    let (_, path) = item.repository_url.rsplit_once("/repos/")?;
    let (owner, name) = path.trim_end_matches('/').split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }

    let web_url = ["/issues/", "/pull/"]
        .iter()
        .find_map(|marker| item.html_url.rfind(marker))
        .map(|idx| item.html_url[..idx].to_string())?;

    Some(Repository::new(owner, name, web_url))
}

//! Catalog client implementation
//!
//! Fetches extension repositories, their `extensions.json` manifests, and
//! README descriptions from a GitHub-style API and assembles the catalog.
//! Repositories that carry no manifest get default metadata (they require
//! their group's base component and conflict with nothing).

use std::time::Duration;

use serde::Deserialize;

use crate::config::defaults::MAX_FETCH_RETRIES;
use crate::config::UpstreamConfig;
use crate::core::extension::{Catalog, Extension, ExtensionGroup};
use crate::error::CatalogError;

/// Image shown for extensions without one of their own
const DEFAULT_IMG_SRC: &str = "img/logo-default.png";

/// Repository search result
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    html_url: String,
}

/// One release of a repository
#[derive(Debug, Deserialize)]
struct ReleaseItem {
    tag_name: String,
}

/// Per-repository `extensions.json` manifest
#[derive(Debug, Deserialize)]
struct ExtensionManifest {
    #[serde(default)]
    required_extensions: Vec<String>,
    #[serde(default)]
    incompatible_extensions: Vec<String>,
    #[serde(default)]
    img_src: Option<String>,
}

/// Catalog client for a GitHub-style API
#[derive(Debug)]
pub struct CatalogClient {
    /// HTTP client
    client: reqwest::Client,
    /// API base URL, overridable for tests
    api_base: String,
    /// Organization whose repositories are scanned
    organization: String,
    /// Maximum attempts per request
    max_retries: u32,
}

impl CatalogClient {
    /// Create a client for an organization
    pub fn new(api_base: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("bundleforge-build-service")
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_base: api_base.into(),
            organization: organization.into(),
            max_retries: MAX_FETCH_RETRIES,
        }
    }

    /// The API base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Assemble the full catalog
    ///
    /// The two base repositories from the upstream config are always
    /// included first, marked `is_base`, even when the search does not
    /// surface them.
    pub async fn fetch_catalog(
        &self,
        upstream: &UpstreamConfig,
    ) -> Result<Catalog, CatalogError> {
        let frontend_base = repo_short_name(&upstream.frontend_repo);
        let backend_base = repo_short_name(&upstream.backend_repo);

        let mut repos: Vec<(String, String, bool)> = vec![
            (frontend_base.clone(), upstream.frontend_repo.clone(), true),
            (backend_base.clone(), upstream.backend_repo.clone(), true),
        ];

        let url = format!(
            "{}/search/repositories?q=extension+in:name+org:{}",
            self.api_base, self.organization
        );
        let search: SearchResponse = self.get_json(&url).await?;
        tracing::info!(count = search.items.len(), "extension repositories found");

        for item in search.items {
            let short = self.short_name(&item.name);
            if repos.iter().any(|(name, _, _)| *name == short) {
                continue;
            }
            repos.push((short, item.html_url, false));
        }

        let mut catalog = Catalog::default();
        for (name, repository, is_base) in repos {
            let Some(group) = group_of(&name) else {
                tracing::warn!(name, "repository matches neither group, skipped");
                continue;
            };
            let entries = self
                .repo_entries(&name, &repository, group, is_base, upstream)
                .await;
            match group {
                ExtensionGroup::Frontend => catalog.frontend.extend(entries),
                ExtensionGroup::Backend => catalog.backend.extend(entries),
            }
        }

        Ok(catalog)
    }

    /// Build one catalog entry per available version of a repository
    async fn repo_entries(
        &self,
        name: &str,
        repository: &str,
        group: ExtensionGroup,
        is_base: bool,
        upstream: &UpstreamConfig,
    ) -> Vec<Extension> {
        let repo_name = self.full_name(name);

        let manifest = match self.fetch_manifest(&repo_name, &upstream.default_branch).await {
            Ok(manifest) => Some(manifest),
            Err(error) => {
                tracing::warn!(name, error = %error, "no usable manifest, using defaults");
                None
            }
        };

        let description = match self
            .fetch_description(&repo_name, &upstream.default_branch)
            .await
        {
            Ok(description) => Some(description),
            Err(error) => {
                tracing::debug!(name, error = %error, "no description");
                None
            }
        };

        let (required, incompatible, img_src) = match manifest {
            Some(manifest) => (
                manifest.required_extensions,
                manifest.incompatible_extensions,
                manifest.img_src,
            ),
            None => {
                let frontend_base = repo_short_name(&upstream.frontend_repo);
                let backend_base = repo_short_name(&upstream.backend_repo);
                // Bases require each other; extensions require their own
                // group's base
                let required = match (is_base, group) {
                    (true, ExtensionGroup::Frontend) => vec![backend_base],
                    (true, ExtensionGroup::Backend) => vec![frontend_base],
                    (false, ExtensionGroup::Frontend) => vec![frontend_base],
                    (false, ExtensionGroup::Backend) => vec![backend_base],
                };
                (required, vec![], None)
            }
        };

        let mut versions = vec![upstream.default_branch.clone()];
        match self.fetch_releases(&repo_name).await {
            Ok(tags) => versions.extend(tags),
            Err(error) => {
                tracing::debug!(name, error = %error, "no releases");
            }
        }

        versions
            .into_iter()
            .map(|version| Extension {
                name: name.to_string(),
                version,
                group,
                repository: repository.to_string(),
                required_extensions: required.clone(),
                incompatible_extensions: incompatible.clone(),
                img_src: img_src
                    .clone()
                    .or_else(|| Some(DEFAULT_IMG_SRC.to_string())),
                description: description.clone(),
                active: true,
                is_base,
            })
            .collect()
    }

    async fn fetch_manifest(
        &self,
        repo_name: &str,
        branch: &str,
    ) -> Result<ExtensionManifest, CatalogError> {
        let url = format!(
            "{}/repos/{}/{}/contents/extensions.json?ref={}",
            self.api_base, self.organization, repo_name, branch
        );
        let raw = self.get_raw(&url).await?;
        serde_json::from_str(&raw).map_err(|e| CatalogError::ParseFailed {
            url,
            error: e.to_string(),
        })
    }

    async fn fetch_description(
        &self,
        repo_name: &str,
        branch: &str,
    ) -> Result<String, CatalogError> {
        let url = format!(
            "{}/repos/{}/{}/readme?ref={}",
            self.api_base, self.organization, repo_name, branch
        );
        let readme = self.get_raw(&url).await?;
        extract_description(&readme).ok_or_else(|| CatalogError::ParseFailed {
            url,
            error: "no project description section".to_string(),
        })
    }

    async fn fetch_releases(&self, repo_name: &str) -> Result<Vec<String>, CatalogError> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            self.api_base, self.organization, repo_name
        );
        let releases: Vec<ReleaseItem> = self.get_json(&url).await?;
        Ok(releases.into_iter().map(|r| r.tag_name).collect())
    }

    /// GET returning parsed JSON, with retry
    async fn get_json<D: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<D, CatalogError> {
        let body = self.get_with_retry(url, "application/json").await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::ParseFailed {
            url: url.to_string(),
            error: e.to_string(),
        })
    }

    /// GET returning the raw file content behind a contents-style endpoint
    async fn get_raw(&self, url: &str) -> Result<String, CatalogError> {
        self.get_with_retry(url, "application/vnd.github.raw+json")
            .await
    }

    async fn get_with_retry(&self, url: &str, accept: &str) -> Result<String, CatalogError> {
        let mut last_error = CatalogError::RequestFailed {
            url: url.to_string(),
            error: "no attempts made".to_string(),
        };

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Linear backoff is plenty for a metadata refresh
                tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
            }
            match self.get_once(url, accept).await {
                Ok(body) => return Ok(body),
                // Client errors are definitive, only transport and server
                // errors are worth retrying
                Err(CatalogError::Status { status, .. }) if status < 500 => {
                    return Err(CatalogError::Status {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(error) => {
                    tracing::debug!(url, attempt, error = %error, "fetch attempt failed");
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }

    async fn get_once(&self, url: &str, accept: &str) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| CatalogError::RequestFailed {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| CatalogError::RequestFailed {
            url: url.to_string(),
            error: e.to_string(),
        })
    }

    /// Strip the organization prefix from a repository name
    fn short_name(&self, repo_name: &str) -> String {
        let prefix = format!("{}-", self.organization);
        repo_name
            .strip_prefix(&prefix)
            .unwrap_or(repo_name)
            .to_string()
    }

    /// Reconstruct the repository name from a catalog name
    fn full_name(&self, short: &str) -> String {
        format!("{}-{}", self.organization, short)
    }
}

/// Which group a catalog name belongs to, by naming convention
fn group_of(name: &str) -> Option<ExtensionGroup> {
    if name.starts_with("frontend") {
        Some(ExtensionGroup::Frontend)
    } else if name.starts_with("backend") {
        Some(ExtensionGroup::Backend)
    } else {
        None
    }
}

/// Last path segment of a repository URL, without a `.git` suffix
fn repo_short_name(repository: &str) -> String {
    let tail = repository
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repository);
    let tail = tail.strip_suffix(".git").unwrap_or(tail);
    // Catalog names drop the organization prefix: "<org>-frontend" and
    // "acme-frontend" both shorten to "frontend"
    match tail.find("frontend").or_else(|| tail.find("backend")) {
        Some(index) => tail[index..].to_string(),
        None => tail.to_string(),
    }
}

/// Pull the "Project Description" section out of a README
fn extract_description(readme: &str) -> Option<String> {
    let (_, after) = readme.split_once("## Project Description")?;
    let section = after.split("##").next().unwrap_or(after).trim();
    if section.is_empty() {
        return None;
    }
    Some(strip_markdown(section))
}

/// Remove common markdown syntax, keeping the plain text
fn strip_markdown(text: &str) -> String {
    // Images first so their alt text does not survive as a link
    let images = regex::Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("static pattern");
    let links = regex::Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("static pattern");
    let emphasis = regex::Regex::new(r"[*_`]+").expect("static pattern");

    let text = images.replace_all(text, "");
    let text = links.replace_all(&text, "$1");
    let text = emphasis.replace_all(&text, "");
    text.trim().to_string()
}

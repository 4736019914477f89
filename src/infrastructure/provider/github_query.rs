use serde::Deserialize;

use super::provider_config::GithubQueryConfig;
use super::provider_interface::ProviderError;

const DEFAULT_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct GithubRepository {
    name: String,
}

/// Lists the repositories of a GitHub organisation
#[derive(Debug, Clone)]
pub struct GithubQuery {
    client: reqwest::Client,
    base_url: String,
    org_name: String,
    auth_token: Option<String>,
}

impl GithubQuery {
    pub fn new(config: &GithubQueryConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("depsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            org_name: config.org_name.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn page_url(&self, page: usize) -> String {
        format!(
            "{}/orgs/{}/repos?per_page={}&page={}",
            self.base_url, self.org_name, PAGE_SIZE, page
        )
    }

    /// Repository names of the organisation, following pagination
    pub async fn list_repositories(&self) -> Result<Vec<String>, ProviderError> {
        let mut names = Vec::new();
        let mut page = 1;

        loop {
            let url = self.page_url(page);
            let mut request = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.auth_token {
                request = request.header("Authorization", format!("token {}", token));
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(ProviderError::HttpStatus {
                    url,
                    status: response.status().as_u16(),
                });
            }

            let repositories: Vec<GithubRepository> = response.json().await?;
            let count = repositories.len();
            names.extend(repositories.into_iter().map(|repo| repo.name));

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            "Found {} repositories in organisation {}",
            names.len(),
            self.org_name
        );
        Ok(names)
    }
}

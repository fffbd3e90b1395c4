use graphql_client::Response as GraphQLResponse;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::error::{CycleTimeError, Result};

/// Project board events are still behind the starfox preview.
const PREVIEW_ACCEPT: &str = "application/vnd.github.starfox-preview+json";

pub struct GitHubClient {
    pub client: Client,
    pub graphql_url: Url,
    token: Token,
}

impl GitHubClient {
    pub fn new(graphql_url: Url, token: Token, timeout: Duration) -> Result<Self> {
        if token.is_empty() {
            return Err(CycleTimeError::Config("GitHub token is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(PREVIEW_ACCEPT));

        let client = Client::builder()
            .user_agent(concat!("cycletime/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CycleTimeError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            graphql_url,
            token,
        })
    }

    fn authorization(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("bearer {}", self.token.as_str()))
            .map_err(|e| CycleTimeError::Config(format!("Invalid GitHub token: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Execute a GraphQL request and return its `data` after checking for errors.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The request cannot be sent or times out
    /// * The API answers with a non-2xx status
    /// * The body is not a valid GraphQL response for `T`
    /// * The response carries GraphQL errors or no data
    pub(super) async fn execute_graphql_request<T>(
        &self,
        request_body: &impl serde::Serialize,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!("POST {}", self.graphql_url);

        let response = self
            .client
            .post(self.graphql_url.clone())
            .header(AUTHORIZATION, self.authorization()?)
            .json(request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(CycleTimeError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        let response_body: GraphQLResponse<T> = serde_json::from_str(&body)
            .map_err(|e| CycleTimeError::MalformedResponse(e.to_string()))?;

        if let Some(errors) = response_body.errors.filter(|errors| !errors.is_empty()) {
            return Err(CycleTimeError::GraphQL {
                errors: errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        response_body.data.ok_or(CycleTimeError::NoResponseData)
    }
}

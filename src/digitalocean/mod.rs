//! DigitalOcean v2 REST client implementing [`ProviderApi`].

mod wire;

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{
    ApiFuture, CreateSpec, CreatedDroplet, DropletAction, ImageScope, NewKey, ProviderApi,
    ProviderError,
};
use crate::config::{ConfigError, DigitalOceanConfig};
use crate::types::{ActionId, ActionRecord, Droplet, DropletId, Resource, SshKey};
use wire::{ActionEnvelope, CreateEnvelope, DropletEnvelope, ErrorBody, KeyEnvelope, Page};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PER_PAGE: &str = "50";

/// Authenticated client for the DigitalOcean API. Build it once and share
/// it by reference.
#[derive(Clone)]
pub struct DigitalOceanClient {
    http: Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for DigitalOceanClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DigitalOceanClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn transport(endpoint: &str, err: &reqwest::Error) -> ProviderError {
    ProviderError::Transport {
        endpoint: endpoint.to_owned(),
        message: err.to_string(),
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|err| ProviderError::Decode {
        endpoint: endpoint.to_owned(),
        message: err.to_string(),
    })
}

/// Picks the provider's `message` out of an error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| body.trim().to_owned())
}

impl DigitalOceanClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when no token is configured and
    /// [`ConfigError::Invalid`] when the HTTP client cannot be built.
    pub fn new(config: &DigitalOceanConfig) -> Result<Self, ConfigError> {
        Self::with_base_url(config.api_token()?, &config.api_base_url)
    }

    /// Builds a client against an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the HTTP client cannot be built.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| ConfigError::Invalid(format!("HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Sends `request` and returns the status and body of a successful
    /// response.
    async fn execute(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<(u16, String), ProviderError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| transport(endpoint, &err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport(endpoint, &err))?;
        debug!(endpoint, status = status.as_u16(), "DigitalOcean response");

        if status.is_success() {
            Ok((status.as_u16(), body))
        } else {
            Err(ProviderError::Api {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let (_, body) = self.execute(path, self.http.get(self.url(path))).await?;
        decode(path, &body)
    }

    /// Fetches every page of a collection, following `links.pages.next`.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        field: &str,
    ) -> Result<Vec<T>, ProviderError> {
        let mut items = Vec::new();
        let mut request = self
            .http
            .get(self.url(path))
            .query(query)
            .query(&[("per_page", PER_PAGE)]);
        loop {
            let (_, body) = self.execute(path, request).await?;
            let mut page: Page = decode(path, &body)?;
            let values = page.body.remove(field).unwrap_or_default();
            if !values.is_null() {
                let batch: Vec<T> =
                    serde_json::from_value(values).map_err(|err| ProviderError::Decode {
                        endpoint: path.to_owned(),
                        message: err.to_string(),
                    })?;
                items.extend(batch);
            }
            let Some(next) = page.next() else {
                return Ok(items);
            };
            request = self.http.get(next);
        }
    }
}

impl ProviderApi for DigitalOceanClient {
    fn create_droplet<'a>(&'a self, spec: &'a CreateSpec) -> ApiFuture<'a, CreatedDroplet> {
        Box::pin(async move {
            let endpoint = "droplets";
            let (_, body) = self
                .execute(endpoint, self.http.post(self.url(endpoint)).json(spec))
                .await?;
            let envelope: CreateEnvelope = decode(endpoint, &body)?;
            Ok(CreatedDroplet {
                droplet: envelope.droplet,
                action_ids: envelope
                    .links
                    .actions
                    .into_iter()
                    .map(|link| link.id)
                    .collect(),
            })
        })
    }

    fn delete_droplet(&self, id: DropletId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let endpoint = format!("droplets/{id}");
            self.execute(&endpoint, self.http.delete(self.url(&endpoint)))
                .await?;
            Ok(())
        })
    }

    fn request_action<'a>(
        &'a self,
        id: DropletId,
        action: &'a DropletAction,
    ) -> ApiFuture<'a, ActionRecord> {
        Box::pin(async move {
            let endpoint = format!("droplets/{id}/actions");
            let (status, body) = self
                .execute(&endpoint, self.http.post(self.url(&endpoint)).json(action))
                .await?;
            let envelope: ActionEnvelope = decode(&endpoint, &body)?;
            if let Some(message) = envelope.message {
                return Err(ProviderError::Api {
                    endpoint,
                    status,
                    message,
                });
            }
            envelope.action.ok_or_else(|| ProviderError::Decode {
                endpoint,
                message: String::from("response carried no action"),
            })
        })
    }

    fn get_action(&self, id: ActionId) -> ApiFuture<'_, ActionRecord> {
        Box::pin(async move {
            let endpoint = format!("actions/{id}");
            let envelope: ActionEnvelope = self.get_json(&endpoint).await?;
            envelope.action.ok_or_else(|| ProviderError::Decode {
                endpoint,
                message: String::from("response carried no action"),
            })
        })
    }

    fn get_droplet(&self, id: DropletId) -> ApiFuture<'_, Droplet> {
        Box::pin(async move {
            let envelope: DropletEnvelope = self.get_json(&format!("droplets/{id}")).await?;
            Ok(envelope.droplet)
        })
    }

    fn list_droplets(&self) -> ApiFuture<'_, Vec<Droplet>> {
        Box::pin(self.list_all("droplets", &[], "droplets"))
    }

    fn list_images(&self, scope: ImageScope) -> ApiFuture<'_, Vec<Resource>> {
        Box::pin(async move {
            match scope {
                ImageScope::All => self.list_all("images", &[], "images").await,
                ImageScope::Private => {
                    self.list_all("images", &[("private", "true")], "images")
                        .await
                }
            }
        })
    }

    fn list_sizes(&self) -> ApiFuture<'_, Vec<Resource>> {
        Box::pin(self.list_all("sizes", &[], "sizes"))
    }

    fn list_regions(&self) -> ApiFuture<'_, Vec<Resource>> {
        Box::pin(self.list_all("regions", &[], "regions"))
    }

    fn list_keys(&self) -> ApiFuture<'_, Vec<SshKey>> {
        Box::pin(self.list_all("account/keys", &[], "ssh_keys"))
    }

    fn add_key<'a>(&'a self, key: &'a NewKey) -> ApiFuture<'a, SshKey> {
        Box::pin(async move {
            let endpoint = "account/keys";
            let (_, body) = self
                .execute(endpoint, self.http.post(self.url(endpoint)).json(key))
                .await?;
            let envelope: KeyEnvelope = decode(endpoint, &body)?;
            Ok(envelope.ssh_key)
        })
    }
}

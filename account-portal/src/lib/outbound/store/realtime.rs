use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ETAG;
use reqwest::header::IF_MATCH;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use serde_json::Value;

use crate::domain::store::KeyValueStore;
use crate::domain::store::SetOutcome;
use crate::domain::store::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";
const MAX_CONDITIONAL_ATTEMPTS: usize = 3;

/// Store backed by a hosted real-time database's REST API.
///
/// Each key maps to `<base>/<key>.json`. Create-if-absent uses the
/// database's ETag preconditions: read the ETag of the (absent) node, then
/// write with `if-match`; a concurrent writer makes the write fail with 412.
pub struct RealtimeKeyValueStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RealtimeKeyValueStore {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self::with_client(client, base_url, auth_token))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let auth_token = auth_token.filter(|token| !token.is_empty());

        Self {
            client,
            base_url,
            auth_token,
        }
    }

    fn node_url(&self, key: &str) -> String {
        format!("{}/{}.json", self.base_url, key)
    }

    fn request(&self, method: Method, key: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.node_url(key));
        match &self.auth_token {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        }
    }
}

#[async_trait]
impl KeyValueStore for RealtimeKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .request(Method::GET, key)
            .send()
            .await
            .map_err(transport_error)?;
        let value: Value = check_status(response).await?.json().await.map_err(body_error)?;

        // absent nodes read as null
        Ok(Some(value).filter(|v| !v.is_null()))
    }

    async fn set_if_absent(&self, key: &str, value: Value) -> Result<SetOutcome, StoreError> {
        let response = self
            .request(Method::GET, key)
            .header(ETAG_REQUEST_HEADER, "true")
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let mut etag = etag_of(&response)?;
        let mut current: Value = response.json().await.map_err(body_error)?;

        for _ in 0..MAX_CONDITIONAL_ATTEMPTS {
            if !current.is_null() {
                return Ok(SetOutcome::AlreadyExists);
            }

            let response = self
                .request(Method::PUT, key)
                .header(IF_MATCH, etag.as_str())
                .json(&value)
                .send()
                .await
                .map_err(transport_error)?;

            if response.status() == StatusCode::PRECONDITION_FAILED {
                // the body carries the node's current value and ETag
                etag = etag_of(&response)?;
                current = response.json().await.map_err(body_error)?;
                tracing::debug!(key, "Conditional write conflicted, re-evaluating");
                continue;
            }

            check_status(response).await?;
            return Ok(SetOutcome::Created);
        }

        Err(StoreError::Unavailable(format!(
            "conditional write on {} kept conflicting",
            key
        )))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, key)
            .json(&value)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;

        Ok(())
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let response = self
            .request(Method::GET, "")
            .query(&[("shallow", "true")])
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;

        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    let detail = format!("{}: {}", status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        StoreError::Unavailable(detail)
    } else {
        StoreError::Rejected(detail)
    }
}

fn etag_of(response: &Response) -> Result<String, StoreError> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Malformed("response carries no ETag".to_string()))
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn body_error(e: reqwest::Error) -> StoreError {
    StoreError::Malformed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_url() {
        let store = RealtimeKeyValueStore::with_client(
            reqwest::Client::new(),
            "https://example.firebaseio.com/",
            Some(String::new()),
        );

        assert_eq!(
            store.node_url("usernames/jane"),
            "https://example.firebaseio.com/usernames/jane.json"
        );
        assert!(store.auth_token.is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "Permission denied".to_string()),
            StoreError::Rejected(detail) if detail.contains("Permission denied")
        ));
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use infodex_core::response::{
    DeleteByQueryResponse, ErrorResponse, GetResponse, InfoResponse, SearchResponse,
};
use infodex_core::{
    ClientConfig, DeleteByQueryBody, FilterExpr, SearchBody, SearchOptions, UserRecord,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::CallContext;
use crate::{Result, StoreError};

/// Access layer over the user record collection of a search engine.
///
/// One value is meant to live for the whole process; it is `Send + Sync`
/// and the underlying HTTP client pools connections.
pub struct Client {
    http: HttpClient,
    addresses: Vec<String>,
    next_address: AtomicUsize,
    index: String,
    basic_auth: Option<(String, Option<String>)>,
    refresh_on_write: bool,
}

impl Client {
    /// Create a client for a single engine at `base_url`, collection `info`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::for_address(base_url))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        if config.addresses.is_empty() {
            return Err(StoreError::Config(
                "at least one engine address is required".to_string(),
            ));
        }
        if config.index.is_empty() || config.index.contains('/') {
            return Err(StoreError::Config(format!(
                "invalid index name: {:?}",
                config.index
            )));
        }

        let mut addresses = Vec::with_capacity(config.addresses.len());
        for address in &config.addresses {
            let trimmed = address.trim_end_matches('/');
            Url::parse(trimmed).map_err(|e| {
                StoreError::Config(format!("invalid engine address {}: {}", address, e))
            })?;
            addresses.push(trimmed.to_string());
        }

        let mut builder = HttpClient::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let basic_auth = match (&config.api_key, &config.username) {
            (Some(api_key), _) => {
                let mut value = HeaderValue::from_str(&format!("ApiKey {}", api_key))
                    .map_err(|_| StoreError::Config("api key is not a valid header value".to_string()))?;
                value.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value);
                builder = builder.default_headers(headers);
                None
            }
            (None, Some(username)) => Some((username.clone(), config.password.clone())),
            (None, None) => None,
        };

        let http = builder
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            addresses = ?addresses,
            index = %config.index,
            "Engine client configured"
        );

        Ok(Self {
            http,
            addresses,
            next_address: AtomicUsize::new(0),
            index: config.index,
            basic_auth,
            refresh_on_write: config.refresh_on_write,
        })
    }

    /// Collection this client reads and writes
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Store a new record under its id; fails with `Conflict` if the id is taken
    #[tracing::instrument(skip(self, ctx, record), fields(index = %self.index, id = record.id))]
    pub async fn create(&self, ctx: &CallContext, record: &UserRecord) -> Result<()> {
        let body = encode(record)?;
        let path = self.write_path(format!("{}/_create/{}", self.index, record.document_id()));

        ctx.run(async {
            let response = self.json_request(Method::PUT, &path, body).send().await?;

            match response.status() {
                status if status.is_success() => {
                    tracing::debug!("Document created");
                    Ok(())
                }
                StatusCode::CONFLICT => {
                    tracing::debug!("Document already exists");
                    Err(StoreError::Conflict { id: record.id })
                }
                _ => Err(Failure::read(response).await.into_error()),
            }
        })
        .await
    }

    /// Fetch the record stored under `id`, `None` when there is none
    #[tracing::instrument(skip(self, ctx), fields(index = %self.index))]
    pub async fn get_by_id(&self, ctx: &CallContext, id: i64) -> Result<Option<UserRecord>> {
        let path = format!("{}/_doc/{}", self.index, id);

        ctx.run(async {
            let response = self.request(Method::GET, &path).send().await?;

            if response.status() == StatusCode::NOT_FOUND {
                tracing::debug!("Document not found");
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(Failure::read(response).await.into_error());
            }

            let doc: GetResponse<UserRecord> = decode(response).await?;
            Ok(if doc.found { doc.source } else { None })
        })
        .await
    }

    /// Remove the record stored under `id`; removing an absent id succeeds
    #[tracing::instrument(skip(self, ctx), fields(index = %self.index))]
    pub async fn delete_by_id(&self, ctx: &CallContext, id: i64) -> Result<()> {
        let path = self.write_path(format!("{}/_doc/{}", self.index, id));

        ctx.run(async {
            let response = self.request(Method::DELETE, &path).send().await?;

            match response.status() {
                status if status.is_success() => {
                    tracing::debug!("Document deleted");
                    Ok(())
                }
                StatusCode::NOT_FOUND => {
                    tracing::debug!("Nothing to delete");
                    Ok(())
                }
                _ => Err(Failure::read(response).await.into_error()),
            }
        })
        .await
    }

    /// Remove every record matching `filter`, returning how many went away
    #[tracing::instrument(skip(self, ctx, filter), fields(index = %self.index))]
    pub async fn delete_by_query(&self, ctx: &CallContext, filter: &FilterExpr) -> Result<u64> {
        let body = encode(&DeleteByQueryBody::new(filter))?;
        let mut path = format!("{}/_delete_by_query", self.index);
        if self.refresh_on_write {
            // delete-by-query only accepts true/false here
            path.push_str("?refresh=true");
        }

        ctx.run(async {
            let response = self.json_request(Method::POST, &path, body).send().await?;

            if !response.status().is_success() {
                let failure = Failure::read(response).await;
                if failure.is_index_not_found() {
                    return Ok(0);
                }
                return Err(failure.into_error());
            }

            let result: DeleteByQueryResponse = decode(response).await?;
            tracing::debug!(deleted = result.deleted, "Delete by query finished");
            Ok(result.deleted)
        })
        .await
    }

    /// Search records matching `filter`, in engine order unless a sort is given
    #[tracing::instrument(skip(self, ctx, filter, options), fields(index = %self.index))]
    pub async fn search(
        &self,
        ctx: &CallContext,
        filter: &FilterExpr,
        options: &SearchOptions,
    ) -> Result<Vec<UserRecord>> {
        let body = encode(&SearchBody::new(filter, options))?;
        let path = format!("{}/_search", self.index);

        ctx.run(async {
            let response = self.json_request(Method::POST, &path, body).send().await?;

            if !response.status().is_success() {
                let failure = Failure::read(response).await;
                if failure.is_index_not_found() {
                    tracing::debug!("Index does not exist yet");
                    return Ok(Vec::new());
                }
                return Err(failure.into_error());
            }

            let result: SearchResponse<UserRecord> = decode(response).await?;
            let records: Vec<UserRecord> = result
                .hits
                .hits
                .into_iter()
                .filter_map(|hit| hit.source)
                .collect();

            tracing::debug!(hits = records.len(), took = result.took, "Search finished");
            Ok(records)
        })
        .await
    }

    /// Engine name and version
    #[tracing::instrument(skip(self, ctx))]
    pub async fn info(&self, ctx: &CallContext) -> Result<InfoResponse> {
        ctx.run(async {
            let response = self.request(Method::GET, "").send().await?;

            if !response.status().is_success() {
                return Err(Failure::read(response).await.into_error());
            }

            decode(response).await
        })
        .await
    }

    /// Round-robin over the configured addresses
    fn url(&self, path: &str) -> String {
        let slot = self.next_address.fetch_add(1, Ordering::Relaxed) % self.addresses.len();
        format!("{}/{}", self.addresses[slot], path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.basic_auth {
            Some((username, password)) => request.basic_auth(username, password.as_ref()),
            None => request,
        }
    }

    fn json_request(&self, method: Method, path: &str, body: Vec<u8>) -> RequestBuilder {
        self.request(method, path)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
    }

    fn write_path(&self, path: String) -> String {
        if self.refresh_on_write {
            format!("{}?refresh=wait_for", path)
        } else {
            path
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(StoreError::Encoding)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(StoreError::Decoding)
}

/// Non-success response with its body, parsed when it has the engine's error shape
struct Failure {
    status: u16,
    body: String,
    error: Option<ErrorResponse>,
}

impl Failure {
    async fn read(response: Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str(&body).ok();
        Self {
            status,
            body,
            error,
        }
    }

    fn is_index_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
            && self.error.as_ref().is_some_and(ErrorResponse::is_index_not_found)
    }

    fn into_error(self) -> StoreError {
        let message = match self.error {
            Some(error) => format!("{}: {}", error.error.error_type, error.error.reason),
            None => self.body,
        };
        tracing::warn!(status = self.status, %message, "Engine returned an error");
        StoreError::Server {
            status: self.status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_addresses() {
        let config = ClientConfig {
            addresses: Vec::new(),
            ..ClientConfig::default()
        };
        assert!(matches!(Client::from_config(config), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(matches!(Client::new("not a url"), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_index() {
        let config = ClientConfig {
            index: "info/_doc".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(Client::from_config(config), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_addresses_rotate() {
        let config = ClientConfig {
            addresses: vec![
                "http://es1:9200/".to_string(),
                "http://es2:9200".to_string(),
            ],
            ..ClientConfig::default()
        };
        let client = Client::from_config(config).unwrap();

        assert_eq!(client.url("info/_search"), "http://es1:9200/info/_search");
        assert_eq!(client.url("info/_search"), "http://es2:9200/info/_search");
        assert_eq!(client.url(""), "http://es1:9200/");
    }

    #[test]
    fn test_refresh_on_write_path() {
        let config = ClientConfig {
            refresh_on_write: true,
            ..ClientConfig::default()
        };
        let client = Client::from_config(config).unwrap();
        assert_eq!(
            client.write_path("info/_doc/3".to_string()),
            "info/_doc/3?refresh=wait_for"
        );
    }

    #[test]
    fn test_failure_message_uses_error_reason() {
        let failure = Failure {
            status: 400,
            body: String::new(),
            error: Some(ErrorResponse::new(400, "parsing_exception", "unknown query [fuzzy]")),
        };
        assert!(!failure.is_index_not_found());

        match failure.into_error() {
            StoreError::Server { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "parsing_exception: unknown query [fuzzy]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }
}

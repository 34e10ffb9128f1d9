//! # Connection Provider
//!
//! A [`Connection`] is the handle every query and subscription goes through.
//! Build it once at startup and clone it wherever it is needed, clones share
//! the same HTTP client.
//!
//! When configuration is missing or malformed the handle degrades to a
//! placeholder bound to a sentinel URL. Startup goes on, and every operation
//! issued through the placeholder fails with [`ErrorKind::Configuration`].

use crate::{
    config::AppConfig,
    consts,
    error::{DataError, DataResult, ErrorKind},
    models::Table,
};
use reqwest::{Method, RequestBuilder, Url, header};
use std::sync::{Arc, LazyLock};
use tracing::Instrument;

/// Sentinel endpoint of placeholder handles, never contacted.
static PLACEHOLDER_ENDPOINT: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(consts::PLACEHOLDER_URL).expect("PLACEHOLDER_URL must be a valid url")
});

#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    http_client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    is_placeholder: bool,
}

/// Outcome of [`Connection::check_health`].
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    /// Backend reachable and the `pets` table answers.
    Connected { pet_count: Option<u64> },
    /// Backend reachable but the schema has not been applied yet.
    SchemaMissing { message: String },
    Unreachable(DataError),
}

impl Connection {
    /// Strict constructor, fails when the endpoint is not an http(s) URL or
    /// the key is empty.
    pub fn new(endpoint: &str, api_key: &str) -> DataResult<Self> {
        let endpoint = parse_endpoint(endpoint)?;

        if api_key.trim().is_empty() {
            return Err(DataError::configuration("backend api key is empty"));
        }

        Ok(Self::build(endpoint, api_key.trim().to_string(), false))
    }

    /// Builds the handle from configuration. Never fails: a missing or
    /// malformed value yields a placeholder handle and a warning.
    pub fn from_config(config: &AppConfig) -> Self {
        let missing = config.missing_backend_vars();

        if missing.is_empty() {
            match Self::new(&config.supabase_url, &config.supabase_anon_key) {
                Ok(connection) => return connection,
                Err(e) => {
                    logfire::warn!(
                        "Backend configuration is invalid, using placeholder connection: {error}",
                        error = e.to_string()
                    );
                }
            }
        } else {
            logfire::warn!(
                "Backend credentials not configured, set {missing} to reach the backend",
                missing = missing.join(", ")
            );
        }

        Self::placeholder()
    }

    pub fn placeholder() -> Self {
        Self::build(
            PLACEHOLDER_ENDPOINT.clone(),
            consts::PLACEHOLDER_API_KEY.to_string(),
            true,
        )
    }

    fn build(endpoint: Url, api_key: String, is_placeholder: bool) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                http_client: reqwest::Client::new(),
                endpoint,
                api_key,
                is_placeholder,
            }),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.inner.is_placeholder
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    /// Fails with a configuration error on a placeholder handle.
    pub fn ensure_live(&self) -> DataResult<()> {
        if self.is_placeholder() {
            return Err(DataError::configuration(
                "backend is not configured, set SUPABASE_URL and SUPABASE_ANON_KEY",
            ));
        }
        Ok(())
    }

    /// REST URL of a table, e.g. `https://x.supabase.co/rest/v1/pets`.
    pub fn rest_url(&self, table: Table) -> DataResult<Url> {
        self.join(&format!("{}/{}", consts::REST_PATH, table.as_str()))
    }

    /// Websocket URL of the realtime endpoint, with the api key and protocol
    /// version as query parameters.
    pub fn realtime_url(&self) -> DataResult<Url> {
        let mut url = self.join(consts::REALTIME_PATH)?;

        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| DataError::configuration(format!("cannot use {scheme} for {url}")))?;

        url.query_pairs_mut()
            .append_pair("apikey", self.api_key())
            .append_pair("vsn", consts::REALTIME_PROTOCOL_VSN);

        Ok(url)
    }

    fn join(&self, path: &str) -> DataResult<Url> {
        let mut base = self.inner.endpoint.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        base.join(path)
            .map_err(|e| DataError::configuration(format!("invalid backend path {path}: {e}")))
    }

    /// Request against a table with the backend auth headers set.
    pub(crate) fn request(&self, method: Method, table: Table) -> DataResult<RequestBuilder> {
        self.ensure_live()?;

        Ok(self
            .inner
            .http_client
            .request(method, self.rest_url(table)?)
            .header(consts::HEADER_API_KEY, self.api_key())
            .bearer_auth(self.api_key()))
    }

    /// Checks the `pets` table with a zero-row counted select.
    pub async fn check_health(&self) -> HealthStatus {
        let counted = self
            .count_pets()
            .instrument(logfire::span!("check_health"))
            .await;

        match counted {
            Ok(pet_count) => HealthStatus::Connected { pet_count },
            Err(e) if e.is_missing_relation() => HealthStatus::SchemaMissing {
                message: e.message().to_string(),
            },
            Err(e) => HealthStatus::Unreachable(e),
        }
    }

    async fn count_pets(&self) -> DataResult<Option<u64>> {
        let response = self
            .request(Method::GET, Table::Pets)?
            .query(&[("select", "id"), ("limit", "0")])
            .header(consts::HEADER_PREFER, consts::PREFER_COUNT_EXACT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::from_response(status.as_u16(), &body));
        }

        Ok(response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_total_count))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("is_placeholder", &self.inner.is_placeholder)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(endpoint: &str) -> DataResult<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(DataError::configuration("backend url is empty"));
    }

    let url = Url::parse(endpoint)
        .map_err(|e| DataError::configuration(format!("backend url {endpoint} is invalid: {e}")))?;

    let is_http = matches!(url.scheme(), "http" | "https") && url.has_host();
    if !is_http {
        return Err(DataError::new(
            ErrorKind::Configuration,
            format!("backend url {endpoint} must be an http(s) url"),
        ));
    }

    Ok(url)
}

/// `Content-Range: 0-24/3573` or `*/0`.
fn parse_total_count(content_range: &str) -> Option<u64> {
    content_range.rsplit_once('/')?.1.parse().ok()
}

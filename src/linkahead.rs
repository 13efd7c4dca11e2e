use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Proxy;
use tracing::{info, trace, warn};

use crate::domain::{EntityId, EntityKind, RecordType};
use crate::error::OverviewError;
use crate::store::{Entity, EntityContainer, MetadataStore};

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub ssl_insecure: bool,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl_insecure", &self.ssl_insecure)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .finish()
    }
}

pub fn connect(config: &ConnectionConfig) -> Result<LinkaheadStore, OverviewError> {
    connect_with(config, LinkaheadStore::open)
}

pub fn connect_with<T, F>(config: &ConnectionConfig, mut open: F) -> Result<T, OverviewError>
where
    F: FnMut(&ConnectionConfig, Option<&str>) -> Result<T, OverviewError>,
{
    let direct = match open(config, None) {
        Ok(session) => {
            info!(url = %config.url, "connected to LinkAhead");
            return Ok(session);
        }
        Err(err) => err,
    };

    let Some(proxy) = config.proxy.as_deref() else {
        return Err(OverviewError::ConnectionFailure {
            url: config.url.clone(),
            reason: direct.to_string(),
        });
    };

    warn!(url = %config.url, error = %direct, "direct connection failed, retrying through proxy");
    match open(config, Some(proxy)) {
        Ok(session) => {
            info!(url = %config.url, proxy, "connected to LinkAhead through proxy");
            Ok(session)
        }
        Err(err) => Err(OverviewError::ConnectionFailure {
            url: config.url.clone(),
            reason: format!("direct: {direct}; via proxy: {err}"),
        }),
    }
}

pub fn record_query(record_type: &RecordType) -> String {
    format!("FIND RECORD {}", record_type.as_str())
}

pub fn entity_query(kind: EntityKind, id: EntityId) -> String {
    format!("FIND {} WITH id = '{}'", kind.query_name(), id)
}

/// Store backed by a logged-in LinkAhead HTTP session. Responses are decoded as
/// JSON `{"entities": [...]}`, so the server (or a proxy in front of it) must
/// answer entity queries in that form rather than LinkAhead's native XML.
#[derive(Clone)]
pub struct LinkaheadStore {
    client: Client,
    base_url: String,
}

impl LinkaheadStore {
    pub fn open(config: &ConnectionConfig, proxy: Option<&str>) -> Result<Self, OverviewError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("aba-overview/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| OverviewError::StoreHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.ssl_insecure)
            .cookie_store(true);
        if let Some(proxy) = proxy {
            let proxy =
                Proxy::https(proxy).map_err(|err| OverviewError::StoreHttp(err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|err| OverviewError::StoreHttp(err.to_string()))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        let response = client
            .post(format!("{base_url}/login"))
            .form(&[
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .map_err(|err| OverviewError::StoreHttp(err.to_string()))?;
        Self::handle_status(response)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query(&self, query: &str) -> Result<Vec<Entity>, OverviewError> {
        trace!(query, "linkahead.request");
        let response = self
            .client
            .get(format!("{}/Entity/", self.base_url))
            .query(&[("query", query)])
            .send()
            .map_err(|err| OverviewError::StoreHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let container: EntityContainer = response
            .json()
            .map_err(|err| OverviewError::StoreHttp(err.to_string()))?;
        Ok(container.entities)
    }

    fn handle_status(response: Response) -> Result<Response, OverviewError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "LinkAhead request failed".to_string());
        Err(OverviewError::StoreStatus { status, message })
    }
}

impl MetadataStore for LinkaheadStore {
    fn find_records(&self, record_type: &RecordType) -> Result<Vec<Entity>, OverviewError> {
        self.query(&record_query(record_type))
    }

    fn find_entities(&self, kind: EntityKind, id: EntityId) -> Result<Vec<Entity>, OverviewError> {
        self.query(&entity_query(kind, id))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_matches::assert_matches;

    use super::*;

    fn config(proxy: Option<&str>) -> ConnectionConfig {
        ConnectionConfig {
            url: "https://linkahead.example.org".to_string(),
            username: "reader".to_string(),
            password: "secret".to_string(),
            ssl_insecure: true,
            timeout: Duration::from_secs(5),
            proxy: proxy.map(|value| value.to_string()),
        }
    }

    #[test]
    fn queries_match_linkahead_syntax() {
        assert_eq!(record_query(&RecordType::lsm_scan()), "FIND RECORD LSM_SCAN");
        assert_eq!(
            entity_query(EntityKind::Wavelength, EntityId::new(42)),
            "FIND Wavelengths WITH id = '42'"
        );
    }

    #[test]
    fn falls_back_to_proxy_once() {
        let attempts = RefCell::new(Vec::new());
        let session = connect_with(&config(Some("http://proxy:3128")), |_, proxy| {
            attempts.borrow_mut().push(proxy.map(|p| p.to_string()));
            match proxy {
                None => Err(OverviewError::StoreHttp("timed out".to_string())),
                Some(_) => Ok("proxied"),
            }
        })
        .unwrap();

        assert_eq!(session, "proxied");
        assert_eq!(
            attempts.into_inner(),
            vec![None, Some("http://proxy:3128".to_string())]
        );
    }

    #[test]
    fn fails_without_proxy() {
        let mut calls = 0;
        let result: Result<(), _> = connect_with(&config(None), |_, _| {
            calls += 1;
            Err(OverviewError::StoreHttp("refused".to_string()))
        });
        assert_matches!(result, Err(OverviewError::ConnectionFailure { .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn fails_when_proxy_fails_too() {
        let result: Result<(), _> = connect_with(&config(Some("http://proxy:3128")), |_, _| {
            Err(OverviewError::StoreHttp("refused".to_string()))
        });
        let err = result.unwrap_err();
        assert_matches!(err, OverviewError::ConnectionFailure { .. });
        assert!(err.to_string().contains("via proxy"));
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", config(None));
        assert!(!rendered.contains("secret"));
    }
}

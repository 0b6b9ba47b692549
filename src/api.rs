//! JSON-RPC transport and authenticated API client
//!
//! The wire transport is abstracted behind [`RpcTransport`] so the
//! engine can be driven against an in-memory server in tests. The
//! concrete [`HttpTransport`] speaks JSON-RPC 2.0 over HTTP POST.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ExportFormat;
use crate::error::{Result, SyncError};

/// API major versions this tool is known to work against.
pub const SUPPORTED_API_MAJOR_VERSIONS: &[&str] = &["6.0", "6.4"];

/// A single JSON-RPC call against the configuration API.
///
/// Implementations must be safe to share across worker threads; batch
/// operations issue calls concurrently.
pub trait RpcTransport: Send + Sync {
    /// Invoke `method` with `params`, attaching the session token when
    /// given, and return the `result` member of the response.
    fn call(&self, method: &str, params: Value, auth: Option<&str>) -> Result<Value>;
}

/// HTTP transport speaking JSON-RPC 2.0 against the API endpoint.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: ureq::agent(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl RpcTransport for HttpTransport {
    fn call(&self, method: &str, params: Value, auth: Option<&str>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        if let Some(token) = auth {
            body["auth"] = Value::String(token.to_string());
        }

        let response: Value = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json-rpc")
            .send_json(body)
            .map_err(|e| SyncError::Transport(e.to_string()))?
            .into_json()
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if let Some(err) = response.get("error") {
            return Err(SyncError::Api(err.to_string()));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| SyncError::Api("response carries neither result nor error".to_string()))
    }
}

/// A template row as returned by `template.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRef {
    /// Server-assigned id
    pub templateid: String,
    /// Technical name
    pub host: String,
    /// Visible name
    pub name: String,
}

/// Authenticated client exposing the API surface the sync engine needs.
///
/// Construction authenticates once and verifies that the server's API
/// major version is supported; all later calls reuse the session token.
pub struct ApiClient {
    transport: Box<dyn RpcTransport>,
    auth: String,
    version: String,
}

impl ApiClient {
    /// Authenticate against the API and check version compatibility.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnsupportedApiVersion`] when the server's
    /// major version is not in [`SUPPORTED_API_MAJOR_VERSIONS`], and
    /// transport/API errors when the version probe or login fails.
    pub fn connect(transport: Box<dyn RpcTransport>, user: &str, password: &str) -> Result<Self> {
        let version = transport.call("apiinfo.version", json!([]), None)?;
        let version = version
            .as_str()
            .ok_or_else(|| SyncError::Api("apiinfo.version did not return a string".to_string()))?
            .to_string();
        validate_api_version(&version)?;

        let token = transport.call(
            "user.login",
            json!({"username": user, "password": password}),
            None,
        )?;
        let auth = token
            .as_str()
            .ok_or_else(|| SyncError::Api("user.login did not return a token".to_string()))?
            .to_string();

        Ok(Self {
            transport,
            auth,
            version,
        })
    }

    /// Version string reported by the server.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.transport.call(method, params, Some(&self.auth))
    }

    /// `host.get` filtered by technical host name; an empty filter
    /// returns all hosts.
    pub fn get_hosts(&self, hosts: &[String]) -> Result<Value> {
        self.call(
            "host.get",
            json!({"filter": {"host": hosts}, "output": "extend"}),
        )
    }

    /// `template.get` filtered by technical template name; an empty
    /// filter returns all templates.
    pub fn get_templates(&self, templates: &[String]) -> Result<Vec<TemplateRef>> {
        let result = self.call(
            "template.get",
            json!({"filter": {"host": templates}, "output": "extend"}),
        )?;
        serde_json::from_value(result)
            .map_err(|e| SyncError::Api(format!("unexpected template.get response: {e}")))
    }

    /// `configuration.export` of one object id in the given format.
    pub fn export(&self, object_type: &str, id: &str, format: ExportFormat) -> Result<String> {
        let result = self.call(
            "configuration.export",
            json!({"options": {object_type: [id]}, "format": format.as_str()}),
        )?;
        result
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| SyncError::Api("export did not return a document".to_string()))
    }

    /// `configuration.import` with the supplied rule set and source
    /// payload.
    pub fn import(&self, rules: &Value, format: ExportFormat, source: &str) -> Result<Value> {
        self.call(
            "configuration.import",
            json!({"rules": rules, "format": format.as_str(), "source": source}),
        )
    }
}

fn validate_api_version(version: &str) -> Result<()> {
    if SUPPORTED_API_MAJOR_VERSIONS.contains(&major_of(version).as_str()) {
        Ok(())
    } else {
        Err(SyncError::UnsupportedApiVersion {
            found: version.to_string(),
            supported: SUPPORTED_API_MAJOR_VERSIONS,
        })
    }
}

fn major_of(version: &str) -> String {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => version.to_string(),
    }
}

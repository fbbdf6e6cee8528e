use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HOST;
use tracing::debug;

use crate::error::{DriverError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// One outbound ECP call. The device keeps no session, so this is all the
/// state a call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcpRequest {
    pub method: Method,
    /// Already percent-encoded path, e.g. `/keypress/Lit_%20`
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl EcpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        EcpRequest {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        EcpRequest {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcpResponse {
    pub status: u16,
    pub body: String,
}

impl EcpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Sends ECP requests to a device. The seam between protocol logic and the
/// network; tests substitute a scripted device.
pub trait EcpTransport: Send {
    fn send(&self, request: &EcpRequest) -> Result<EcpResponse>;
}

/// reqwest-backed transport talking to `http://{host}:{ecp_port}`.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    header_host: Option<String>,
}

impl HttpTransport {
    pub fn new(
        host: &str,
        port: u16,
        header_host: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if host.trim().is_empty() {
            return Err(DriverError::InvalidArgument(
                "device host must not be empty".into(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| DriverError::transport("client builder", e))?;

        Ok(HttpTransport {
            client,
            base_url: format!("http://{}:{}", host.trim(), port),
            header_host,
        })
    }
}

impl EcpTransport for HttpTransport {
    fn send(&self, request: &EcpRequest) -> Result<EcpResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, "ecp request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            // ECP rejects POSTs without a Content-Length
            Method::Post => self.client.post(&url).body(Vec::new()),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(host) = &self.header_host {
            builder = builder.header(HOST, host.as_str());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;

        Ok(EcpResponse { status, body })
    }
}

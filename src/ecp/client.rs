use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DriverSettings;
use crate::ecp::keys::RokuKey;
use crate::ecp::model::{
    ActiveApp, AppInfo, DeviceInfo, PlayerState, parse_active_app, parse_apps, parse_device_info,
    parse_player_state,
};
use crate::ecp::portal::{DeveloperPortal, HttpDeveloperPortal, Screenshot};
use crate::ecp::transport::{EcpRequest, EcpResponse, EcpTransport, HttpTransport, Method};
use crate::error::{DriverError, Result};
use crate::ui::snapshot::SnapshotSource;

/// Whether a call may be repeated after a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Idempotent queries: retried up to `read_retries` times
    Read,
    /// Key presses, launches, installs: sent exactly once
    Input,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub read_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            read_retries: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Primitive operations of the remote-control protocol.
pub struct EcpClient {
    transport: Box<dyn EcpTransport>,
    portal: Option<Box<dyn DeveloperPortal>>,
    retry: RetryPolicy,
    key_cooldown: Duration,
    /// Input-class calls attempted so far, successful or not
    inputs: AtomicU64,
}

impl EcpClient {
    pub fn new(transport: Box<dyn EcpTransport>) -> Self {
        EcpClient {
            transport,
            portal: None,
            retry: RetryPolicy::default(),
            key_cooldown: Duration::ZERO,
            inputs: AtomicU64::new(0),
        }
    }

    /// Build the HTTP-backed client for the device named in `settings`.
    pub fn from_settings(settings: &DriverSettings) -> Result<Self> {
        let host = settings.device.host.as_deref().ok_or_else(|| {
            DriverError::InvalidArgument("no device host configured (rokuHost)".into())
        })?;
        let timeout = Duration::from_millis(settings.protocol.request_timeout_ms);

        let transport = HttpTransport::new(
            host,
            settings.device.ecp_port,
            settings.device.header_host.clone(),
            timeout,
        )?;

        let mut client = EcpClient::new(Box::new(transport))
            .with_retry(RetryPolicy {
                read_retries: settings.protocol.read_retries,
                backoff: Duration::from_millis(settings.protocol.retry_backoff_ms),
            })
            .with_key_cooldown(Duration::from_millis(settings.navigation.key_cooldown_ms));

        if let Some(password) = &settings.device.password {
            let portal = HttpDeveloperPortal::new(
                host,
                settings.device.web_port,
                &settings.device.user,
                password,
                timeout,
            )?;
            client = client.with_portal(Box::new(portal));
        }
        Ok(client)
    }

    pub fn with_portal(mut self, portal: Box<dyn DeveloperPortal>) -> Self {
        self.portal = Some(portal);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_key_cooldown(mut self, cooldown: Duration) -> Self {
        self.key_cooldown = cooldown;
        self
    }

    // ========================================================================
    // Call plumbing
    // ========================================================================

    /// Send one request under the retry policy of its class.
    pub fn call(&self, class: CallClass, request: &EcpRequest) -> Result<EcpResponse> {
        let attempts = match class {
            CallClass::Read => self.retry.read_retries + 1,
            CallClass::Input => {
                self.mark_input();
                1
            }
        };

        let mut attempt = 1;
        loop {
            let failure = match self.transport.send(request) {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.is_server_error() => DriverError::protocol(
                    request.path.clone(),
                    format!("HTTP {}: {}", response.status, response.body.trim()),
                ),
                Ok(response) => {
                    return Err(DriverError::protocol(
                        request.path.clone(),
                        format!("HTTP {}: {}", response.status, response.body.trim()),
                    ));
                }
                Err(e) if e.is_transport() => e,
                Err(e) => return Err(e),
            };

            if attempt >= attempts {
                return Err(failure);
            }
            warn!(
                path = %request.path,
                attempt,
                max = attempts,
                error = %failure,
                "read call failed, retrying"
            );
            attempt += 1;
            thread::sleep(self.retry.backoff);
        }
    }

    fn mark_input(&self) {
        self.inputs.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of input calls made through this client. A device UI can only
    /// be assumed unchanged while this stays the same.
    pub fn input_count(&self) -> u64 {
        self.inputs.load(Ordering::SeqCst)
    }

    fn read(&self, path: &str) -> Result<String> {
        Ok(self.call(CallClass::Read, &EcpRequest::get(path))?.body)
    }

    fn input(&self, request: EcpRequest) -> Result<()> {
        self.call(CallClass::Input, &request)?;
        Ok(())
    }

    fn portal(&self) -> Result<&dyn DeveloperPortal> {
        self.portal.as_deref().ok_or_else(|| {
            DriverError::InvalidArgument(
                "developer web server credentials (rokuPass) are required".into(),
            )
        })
    }

    // ========================================================================
    // Keys
    // ========================================================================

    /// Press and release a key. Never retried: a duplicate press would move
    /// focus twice.
    pub fn press_key(&self, key: &RokuKey) -> Result<()> {
        debug!(%key, "keypress");
        self.input(EcpRequest::post(format!("/keypress/{}", key.as_ecp())))?;
        if !self.key_cooldown.is_zero() {
            thread::sleep(self.key_cooldown);
        }
        Ok(())
    }

    pub fn key_down(&self, key: &RokuKey) -> Result<()> {
        self.input(EcpRequest::post(format!("/keydown/{}", key.as_ecp())))
    }

    pub fn key_up(&self, key: &RokuKey) -> Result<()> {
        self.input(EcpRequest::post(format!("/keyup/{}", key.as_ecp())))
    }

    /// Type `text` one literal key at a time.
    pub fn send_text(&self, text: &str) -> Result<()> {
        for key in RokuKey::literals(text) {
            self.press_key(&key)?;
        }
        Ok(())
    }

    // ========================================================================
    // Apps
    // ========================================================================

    pub fn launch(&self, app_id: &str, params: &[(String, String)]) -> Result<()> {
        if app_id.trim().is_empty() {
            return Err(DriverError::InvalidArgument("app id must not be empty".into()));
        }
        let path = format!("/launch/{}", urlencoding::encode(app_id));
        self.input(EcpRequest::post(path).with_query(params.to_vec()))
    }

    /// Relay arbitrary key/value pairs to the running app (`/input`).
    pub fn input_params(&self, params: &[(String, String)]) -> Result<()> {
        if params.is_empty() {
            return Err(DriverError::InvalidArgument("ecp input needs at least one parameter".into()));
        }
        self.input(EcpRequest::post("/input").with_query(params.to_vec()))
    }

    pub fn apps(&self) -> Result<Vec<AppInfo>> {
        parse_apps(&self.read("/query/apps")?)
    }

    pub fn active_app(&self) -> Result<ActiveApp> {
        parse_active_app(&self.read("/query/active-app")?)
    }

    pub fn device_info(&self) -> Result<DeviceInfo> {
        parse_device_info(&self.read("/query/device-info")?)
    }

    pub fn player_state(&self) -> Result<PlayerState> {
        parse_player_state(&self.read("/query/media-player")?)
    }

    pub fn app_ui(&self) -> Result<String> {
        self.read("/query/app-ui")
    }

    /// Raw passthrough. GETs are treated as reads, POSTs as inputs.
    pub fn raw(&self, method: Method, path: &str, query: &[(String, String)]) -> Result<String> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let request = EcpRequest {
            method,
            path,
            query: query.to_vec(),
        };
        let class = match method {
            Method::Get => CallClass::Read,
            Method::Post => CallClass::Input,
        };
        Ok(self.call(class, &request)?.body)
    }

    // ========================================================================
    // Developer web server
    // ========================================================================

    pub fn install(&self, archive: &Path) -> Result<()> {
        let portal = self.portal()?;
        self.mark_input();
        portal.install(archive)
    }

    pub fn remove_dev_app(&self) -> Result<()> {
        let portal = self.portal()?;
        self.mark_input();
        portal.remove()
    }

    /// Screen capture is a read, so transport failures are retried.
    pub fn screenshot(&self) -> Result<Screenshot> {
        let portal = self.portal()?;
        let attempts = self.retry.read_retries + 1;
        let mut attempt = 1;
        loop {
            match portal.screenshot() {
                Err(e) if e.is_transport() && attempt < attempts => {
                    warn!(attempt, max = attempts, error = %e, "screenshot failed, retrying");
                    attempt += 1;
                    thread::sleep(self.retry.backoff);
                }
                result => return result,
            }
        }
    }
}

impl SnapshotSource for EcpClient {
    fn fetch_ui_source(&self) -> Result<String> {
        self.app_ui()
    }

    fn revision(&self) -> u64 {
        self.input_count()
    }
}

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use crate::ecp::client::EcpClient;
use crate::ecp::keys::RokuKey;
use crate::error::{DriverError, Result};
use crate::session::capabilities::{Capabilities, DEV_APP_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Starting,
    Active,
    Ending,
    Ended,
}

/// Lifecycle-scoped session state. Owns no persistent storage.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub capabilities: Capabilities,
    state: SessionState,
}

impl Session {
    pub fn new(capabilities: Capabilities) -> Self {
        Session {
            id: new_session_id(&capabilities),
            capabilities,
            state: SessionState::NotStarted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Whether starting needs a sideload step.
    pub fn requires_install(&self) -> bool {
        self.capabilities.app_to_install().is_some()
    }

    /// Bring the device into a known state for the app under test.
    ///
    /// With an app: sideload it (unless it is `dev`), then launch `dev`. Both
    /// steps are fail-fast and any failure becomes SessionNotCreated. Without
    /// an app: go to the home screen.
    pub fn start(&mut self, client: &EcpClient) -> Result<()> {
        if self.state != SessionState::NotStarted {
            return Err(DriverError::SessionNotCreated(format!(
                "session {} was already started ({:?})",
                self.id, self.state
            )));
        }
        self.state = SessionState::Starting;
        info!(session = %self.id, app = ?self.capabilities.app, "starting session");

        match self.bring_up(client) {
            Ok(()) => {
                self.state = SessionState::Active;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Ended;
                Err(e)
            }
        }
    }

    fn bring_up(&self, client: &EcpClient) -> Result<()> {
        if self.capabilities.app.is_none() {
            return client.press_key(&RokuKey::Home).map_err(|e| {
                DriverError::SessionNotCreated(format!("Failed to reach the home screen. Error: {}", e))
            });
        }

        if let Some(app) = self.capabilities.app_to_install() {
            client.install(Path::new(app)).map_err(|e| {
                DriverError::SessionNotCreated(format!("Failed to install the app {}. Error: {}", app, e))
            })?;
        }

        client.launch(DEV_APP_ID, &[]).map_err(|e| {
            DriverError::SessionNotCreated(format!(
                "Failed to activate the '{}' app. Error: {}",
                DEV_APP_ID, e
            ))
        })
    }

    /// Press Home exactly once, then run `release`. A failed Home press is
    /// logged and teardown continues. Ending a session that is not active
    /// only runs `release`.
    pub fn end<R>(&mut self, client: &EcpClient, release: impl FnOnce() -> R) -> R {
        if self.state != SessionState::Active {
            debug!(session = %self.id, state = ?self.state, "session not active, skipping home");
            let released = release();
            self.state = SessionState::Ended;
            return released;
        }
        self.state = SessionState::Ending;
        info!(session = %self.id, "ending session");

        if let Err(e) = client.press_key(&RokuKey::Home) {
            warn!(session = %self.id, error = %e, "could not return to the home screen");
        }

        let released = release();
        self.state = SessionState::Ended;
        released
    }
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn new_session_id(capabilities: &Capabilities) -> String {
    let sequence = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut hasher = Sha1::new();
    hasher.update(nanos.to_be_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(capabilities.roku_host.as_deref().unwrap_or("").as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!(
        "{}-{}-{}-{}-{}",
        &digest[0..8],
        &digest[8..12],
        &digest[12..16],
        &digest[16..20],
        &digest[20..32]
    )
}

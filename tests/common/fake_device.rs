use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use roku_driver::config::DriverSettings;
use roku_driver::ecp::client::{EcpClient, RetryPolicy};
use roku_driver::ecp::portal::{DeveloperPortal, ImageFormat, Screenshot};
use roku_driver::ecp::transport::{EcpRequest, EcpResponse, EcpTransport, Method};
use roku_driver::error::{DriverError, Result};
use roku_driver::focus::navigator::CancellationToken;

use super::fixtures;

pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

// ============================================================================
// Screen model
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub name: String,
    pub tag: String,
    pub text: String,
    pub bounds: Option<[i32; 4]>,
    pub focusable: bool,
    pub hidden: bool,
    /// Text of a child `<Label>` rendered inside the item
    pub label: Option<String>,
}

/// One container of items plus a title label. Focus moves only along
/// explicit links, like a SceneGraph component with custom key handling.
#[derive(Debug, Clone)]
pub struct FakeScreen {
    pub container: String,
    pub layout: Option<String>,
    pub items: Vec<FakeItem>,
    pub focused: Option<usize>,
    pub links: HashMap<(usize, String), usize>,
}

impl FakeScreen {
    fn items(names: &[&str], place: impl Fn(usize) -> [i32; 4]) -> Vec<FakeItem> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| FakeItem {
                name: name.to_string(),
                tag: "Button".to_string(),
                text: format!("Label {}", name),
                bounds: Some(place(i)),
                focusable: true,
                hidden: false,
                label: None,
            })
            .collect()
    }

    /// Items laid out left to right, Left/Right linked, first one focused.
    pub fn row(names: &[&str]) -> Self {
        let mut screen = FakeScreen {
            container: "RowList".to_string(),
            layout: Some("horiz".to_string()),
            items: Self::items(names, |i| [i as i32 * 200, 100, 180, 100]),
            focused: Some(0),
            links: HashMap::new(),
        };
        for i in 1..names.len() {
            screen = screen.link(i - 1, "Right", i).link(i, "Left", i - 1);
        }
        screen
    }

    /// Items laid out top to bottom, Up/Down linked, first one focused.
    pub fn column(names: &[&str]) -> Self {
        let mut screen = FakeScreen {
            container: "LabelList".to_string(),
            layout: Some("vert".to_string()),
            items: Self::items(names, |i| [100, i as i32 * 120, 400, 100]),
            focused: Some(0),
            links: HashMap::new(),
        };
        for i in 1..names.len() {
            screen = screen.link(i - 1, "Down", i).link(i, "Up", i - 1);
        }
        screen
    }

    /// An on-screen keyboard: a row of keys labelled with their names.
    pub fn keyboard(keys: &[&str]) -> Self {
        let mut screen = Self::row(keys);
        screen.container = "Keyboard".to_string();
        for item in &mut screen.items {
            item.text = item.name.clone();
        }
        screen
    }

    pub fn link(mut self, from: usize, key: &str, to: usize) -> Self {
        self.links.insert((from, key.to_string()), to);
        self
    }

    pub fn without_links(mut self) -> Self {
        self.links.clear();
        self
    }

    pub fn without_bounds(mut self) -> Self {
        for item in &mut self.items {
            item.bounds = None;
        }
        self
    }

    /// Give item N a child `<Label text="Item N"/>`, 1-based.
    pub fn with_labels(mut self) -> Self {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.label = Some(format!("Item {}", i + 1));
        }
        self
    }

    pub fn with_layout(mut self, layout: Option<&str>) -> Self {
        self.layout = layout.map(str::to_string);
        self
    }

    pub fn focused_on(mut self, index: Option<usize>) -> Self {
        self.focused = index;
        self
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|i| i.name == name)
    }

    pub fn focused_name(&self) -> Option<String> {
        self.focused.map(|i| self.items[i].name.clone())
    }

    pub fn render(&self) -> String {
        let any_focus = self.focused.is_some();
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<app-ui>\n<topscreen>\n");
        xml.push_str("<plugin id=\"dev\" name=\"Test Channel\"/>\n");
        xml.push_str(&format!("<screen focused=\"{}\">\n", any_focus));
        xml.push_str("<Label name=\"title\" text=\"Welcome\" bounds=\"{0, 0, 400, 60}\"/>\n");

        xml.push_str(&format!("<{} name=\"menu\" focused=\"{}\"", self.container, any_focus));
        if let Some(layout) = &self.layout {
            xml.push_str(&format!(" layoutDirection=\"{}\"", layout));
        }
        xml.push_str(">\n");

        for (i, item) in self.items.iter().enumerate() {
            if item.hidden {
                continue;
            }
            xml.push_str(&format!(
                "<{} name=\"{}\" text=\"{}\" focusable=\"{}\" focused=\"{}\"",
                item.tag,
                escape(&item.name),
                escape(&item.text),
                item.focusable,
                self.focused == Some(i)
            ));
            if let Some([x, y, w, h]) = item.bounds {
                xml.push_str(&format!(" bounds=\"{{{}, {}, {}, {}}}\"", x, y, w, h));
            }
            match &item.label {
                Some(label) => xml.push_str(&format!(
                    ">\n<Label text=\"{}\"/>\n</{}>\n",
                    escape(label),
                    item.tag
                )),
                None => xml.push_str("/>\n"),
            }
        }
        xml.push_str(&format!("</{}>\n</screen>\n</topscreen>\n</app-ui>\n", self.container));
        xml
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Device state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Status(u16),
    Transport,
}

#[derive(Debug, Clone)]
pub struct FailureRule {
    pub path_prefix: String,
    pub failure: Failure,
    /// None fails forever
    pub remaining: Option<usize>,
}

pub struct DeviceState {
    pub screen: FakeScreen,
    pub requests: Vec<EcpRequest>,
    /// Ordered log of everything the driver did, portal calls included
    pub events: Vec<String>,
    pub failures: Vec<FailureRule>,
    pub active_app: String,
    pub installed: Vec<(String, String)>,
    pub selected: Vec<String>,
    pub installs: Vec<PathBuf>,
    pub install_error: Option<String>,
    pub removals: usize,
    /// Screenshot calls that fail with a transport error before one succeeds
    pub screenshot_failures: usize,
    /// Item hidden right after the next directional key
    pub vanish_on_move: Option<String>,
    /// Token cancelled right after the next directional key
    pub cancel_on_move: Option<CancellationToken>,
}

/// Scripted stand-in for a device. Clones share state, so a test keeps one
/// copy for assertions while the client owns another.
#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl FakeDevice {
    pub fn new(screen: FakeScreen) -> Self {
        FakeDevice {
            state: Arc::new(Mutex::new(DeviceState {
                screen,
                requests: Vec::new(),
                events: Vec::new(),
                failures: Vec::new(),
                active_app: "dev".to_string(),
                installed: vec![
                    ("dev".to_string(), "Test Channel".to_string()),
                    ("12".to_string(), "Netflix".to_string()),
                ],
                selected: Vec::new(),
                installs: Vec::new(),
                install_error: None,
                removals: 0,
                screenshot_failures: 0,
                vanish_on_move: None,
                cancel_on_move: None,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    /// Client over this device with instant retries.
    pub fn client(&self) -> EcpClient {
        EcpClient::new(Box::new(self.clone()))
            .with_portal(Box::new(FakePortal {
                state: Arc::clone(&self.state),
            }))
            .with_retry(RetryPolicy {
                read_retries: 2,
                backoff: Duration::ZERO,
            })
    }

    /// Client with no developer credentials configured.
    pub fn client_without_portal(&self) -> EcpClient {
        EcpClient::new(Box::new(self.clone())).with_retry(RetryPolicy {
            read_retries: 2,
            backoff: Duration::ZERO,
        })
    }

    pub fn fail(&self, path_prefix: &str, failure: Failure, times: Option<usize>) {
        self.state().failures.push(FailureRule {
            path_prefix: path_prefix.to_string(),
            failure,
            remaining: times,
        });
    }

    /// Key names sent to `/keypress`, in order.
    pub fn keypresses(&self) -> Vec<String> {
        self.state()
            .requests
            .iter()
            .filter_map(|r| r.path.strip_prefix("/keypress/").map(str::to_string))
            .collect()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.state().requests.iter().filter(|r| r.path == path).count()
    }

    pub fn input_requests(&self) -> Vec<EcpRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == Method::Post)
            .cloned()
            .collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    pub fn push_event(&self, event: &str) {
        self.state().events.push(event.to_string());
    }

    pub fn focused_name(&self) -> Option<String> {
        self.state().screen.focused_name()
    }
}

/// Settings with no settle delay so navigation tests run instantly.
pub fn test_settings() -> DriverSettings {
    let mut settings = DriverSettings::default();
    settings.navigation.settle_delay_ms = 0;
    settings
}

impl DeviceState {
    fn injected_failure(&mut self, path: &str) -> Option<Failure> {
        let rule = self.failures.iter_mut().find(|r| {
            path.starts_with(&r.path_prefix) && r.remaining.map(|n| n > 0).unwrap_or(true)
        })?;
        if let Some(n) = rule.remaining.as_mut() {
            *n -= 1;
        }
        Some(rule.failure)
    }

    fn press(&mut self, key: &str) {
        match key {
            "Up" | "Down" | "Left" | "Right" => {
                if let Some(from) = self.screen.focused {
                    if let Some(to) = self.screen.links.get(&(from, key.to_string())) {
                        self.screen.focused = Some(*to);
                    }
                }
                if let Some(name) = self.vanish_on_move.take() {
                    if let Some(i) = self.screen.index_of(&name) {
                        self.screen.items[i].hidden = true;
                    }
                }
                if let Some(token) = self.cancel_on_move.take() {
                    token.cancel();
                }
            }
            "Select" => {
                if let Some(name) = self.screen.focused_name() {
                    self.selected.push(name);
                }
            }
            "Home" => self.active_app.clear(),
            "Backspace" => {
                if let Some(i) = self.screen.focused {
                    self.screen.items[i].text.pop();
                }
            }
            other => {
                if let Some(literal) = other.strip_prefix("Lit_") {
                    let decoded = urlencoding::decode(literal).map(|c| c.to_string()).unwrap_or_default();
                    if let Some(i) = self.screen.focused {
                        self.screen.items[i].text.push_str(&decoded);
                    }
                }
            }
        }
    }

    fn route(&mut self, request: &EcpRequest) -> EcpResponse {
        let ok = |body: String| EcpResponse { status: 200, body };
        let path = request.path.as_str();

        match (request.method, path) {
            (Method::Get, "/query/app-ui") => ok(self.screen.render()),
            (Method::Get, "/query/apps") => ok(fixtures::apps_xml(&self.installed)),
            (Method::Get, "/query/active-app") => {
                let name = self
                    .installed
                    .iter()
                    .find(|(id, _)| *id == self.active_app)
                    .map(|(_, name)| name.clone());
                ok(fixtures::active_app_xml(&self.active_app, name.as_deref()))
            }
            (Method::Get, "/query/device-info") => ok(fixtures::DEVICE_INFO.to_string()),
            (Method::Get, "/query/media-player") => ok(fixtures::MEDIA_PLAYER.to_string()),
            (Method::Post, p) if p.starts_with("/keypress/") => {
                let key = p.trim_start_matches("/keypress/").to_string();
                self.press(&key);
                ok(String::new())
            }
            (Method::Post, p) if p.starts_with("/keydown/") || p.starts_with("/keyup/") => ok(String::new()),
            (Method::Post, p) if p.starts_with("/launch/") => {
                let id = p.trim_start_matches("/launch/").to_string();
                if self.installed.iter().any(|(installed, _)| *installed == id) {
                    self.active_app = id;
                    ok(String::new())
                } else {
                    EcpResponse {
                        status: 404,
                        body: "Not Found".to_string(),
                    }
                }
            }
            (Method::Post, "/input") => ok(String::new()),
            _ => EcpResponse {
                status: 404,
                body: "Not Found".to_string(),
            },
        }
    }
}

impl EcpTransport for FakeDevice {
    fn send(&self, request: &EcpRequest) -> Result<EcpResponse> {
        let mut state = self.state();
        state.requests.push(request.clone());
        state.events.push(format!("{} {}", request.method, request.path));

        match state.injected_failure(&request.path) {
            Some(Failure::Transport) => {
                return Err(DriverError::transport(request.path.clone(), "connection refused"));
            }
            Some(Failure::Status(status)) => {
                return Ok(EcpResponse {
                    status,
                    body: "injected failure".to_string(),
                });
            }
            None => {}
        }
        Ok(state.route(request))
    }
}

// ============================================================================
// Developer portal
// ============================================================================

pub struct FakePortal {
    state: Arc<Mutex<DeviceState>>,
}

impl DeveloperPortal for FakePortal {
    fn install(&self, archive: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("install {}", archive.display()));
        if let Some(reason) = state.install_error.clone() {
            return Err(DriverError::protocol("/plugin_install", reason));
        }
        state.installs.push(archive.to_path_buf());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push("remove dev".to_string());
        state.removals += 1;
        Ok(())
    }

    fn screenshot(&self) -> Result<Screenshot> {
        let mut state = self.state.lock().unwrap();
        state.events.push("screenshot".to_string());
        if state.screenshot_failures > 0 {
            state.screenshot_failures -= 1;
            return Err(DriverError::transport("/plugin_inspect", "connection reset"));
        }
        Ok(Screenshot {
            format: ImageFormat::Png,
            bytes: PNG_MAGIC.to_vec(),
        })
    }
}

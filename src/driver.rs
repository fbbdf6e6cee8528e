use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::info;

use crate::cache::element_cache::{ElementCache, ElementHandle};
use crate::commands::{actions, device, element, execute, source};
use crate::config::{DriverSettings, TypingMode};
use crate::ecp::client::EcpClient;
use crate::ecp::model::{ActiveApp, AppInfo, DeviceInfo, PlayerState};
use crate::error::{DriverError, Result};
use crate::focus::navigator::{CancellationToken, FocusNavigator, NavigationLimits};
use crate::session::capabilities::Capabilities;
use crate::session::lifecycle::{Session, SessionState};
use crate::trace::logger::TraceLogger;
use crate::ui::node::Bounds;
use crate::ui::snapshot::{Snapshot, Snapshotter};

pub const NATIVE_CONTEXT: &str = "NATIVE_APP";

// ============================================================================
// Per-session context
// ============================================================================

/// Everything a command needs, passed explicitly to the free functions in
/// `commands`. Session-scoped: dropped when the session ends.
pub struct DriverContext {
    pub client: EcpClient,
    pub snapshots: Snapshotter,
    pub cache: ElementCache,
    pub limits: NavigationLimits,
    pub cancel: CancellationToken,
    pub tracer: TraceLogger,
    pub typing: TypingMode,
    pub current_context: String,
}

impl DriverContext {
    pub fn new(client: EcpClient, settings: &DriverSettings) -> Self {
        DriverContext {
            client,
            snapshots: Snapshotter::new(),
            cache: ElementCache::new(settings.cache.capacity),
            limits: NavigationLimits::from(&settings.navigation),
            cancel: CancellationToken::new(),
            tracer: TraceLogger::from_path(settings.navigation.trace_file.as_deref()),
            typing: settings.navigation.typing_mode,
            current_context: NATIVE_CONTEXT.to_string(),
        }
    }

    /// Context talking HTTP to the device named in `settings`.
    pub fn from_settings(settings: &DriverSettings) -> Result<Self> {
        let client = EcpClient::from_settings(settings)?;
        Ok(DriverContext::new(client, settings))
    }

    /// Fresh snapshot of the device UI.
    pub fn capture(&mut self) -> Result<Arc<Snapshot>> {
        self.snapshots.capture(&self.client)
    }

    /// The last snapshot when no input reached the device since it was
    /// taken. Lookups use this; interactions always capture.
    pub fn cached_capture(&mut self) -> Result<Arc<Snapshot>> {
        self.snapshots.current(&self.client)
    }

    pub fn navigator(&mut self) -> FocusNavigator<'_> {
        FocusNavigator::new(&self.client, &mut self.snapshots, self.limits)
            .with_cancellation(&self.cancel)
            .with_tracer(&self.tracer)
    }
}

// ============================================================================
// Command surface
// ============================================================================

/// The automation operations a hosting server can dispatch to.
pub trait AutomationDriver {
    fn find_element(&self, strategy: &str, selector: &str) -> Result<ElementHandle>;
    fn find_elements(&self, strategy: &str, selector: &str) -> Result<Vec<ElementHandle>>;
    fn find_element_from_element(&self, parent: &ElementHandle, strategy: &str, selector: &str) -> Result<ElementHandle>;
    fn find_elements_from_element(&self, parent: &ElementHandle, strategy: &str, selector: &str) -> Result<Vec<ElementHandle>>;
    fn active_element(&self) -> Result<ElementHandle>;

    fn click(&self, element: &ElementHandle) -> Result<()>;
    fn set_value(&self, element: &ElementHandle, text: &str) -> Result<()>;
    fn clear(&self, element: &ElementHandle) -> Result<()>;
    fn focus(&self, element: &ElementHandle) -> Result<usize>;

    fn get_text(&self, element: &ElementHandle) -> Result<String>;
    fn get_attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;
    fn get_tag_name(&self, element: &ElementHandle) -> Result<String>;
    fn get_element_rect(&self, element: &ElementHandle) -> Result<Option<Bounds>>;
    fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;
    fn is_focused(&self, element: &ElementHandle) -> Result<bool>;

    fn get_page_source(&self) -> Result<String>;
    fn get_screenshot(&self) -> Result<String>;
    fn get_current_context(&self) -> Result<String>;
    fn get_contexts(&self) -> Result<Vec<String>>;
    fn set_context(&self, name: &str) -> Result<()>;

    fn perform_actions(&self, actions: &Value) -> Result<()>;
    fn release_actions(&self) -> Result<()>;
    fn execute(&self, script: &str, args: &[Value]) -> Result<Value>;

    fn press_key(&self, key: &str) -> Result<()>;
    fn install_app(&self, path: &str) -> Result<()>;
    fn remove_app(&self, app_id: &str) -> Result<()>;
    fn activate_app(&self, app_id: &str) -> Result<()>;
    fn terminate_app(&self, app_id: &str) -> Result<bool>;
    fn is_app_installed(&self, app_id: &str) -> Result<bool>;
    fn list_apps(&self) -> Result<Vec<AppInfo>>;
    fn active_app(&self) -> Result<ActiveApp>;
    fn device_info(&self) -> Result<DeviceInfo>;
    fn player_state(&self) -> Result<PlayerState>;
    fn deep_link(&self, app_id: &str, content_id: &str, media_type: &str) -> Result<()>;
    fn ecp_input(&self, params: &[(String, String)]) -> Result<()>;
    fn select_element(&self, attribute: &str, value: &str) -> Result<()>;
    fn ecp(&self, method: &str, path: &str, params: &[(String, String)]) -> Result<String>;
}

// ============================================================================
// Roku driver
// ============================================================================

/// A session against one device. All commands are serialised by one mutex,
/// so two navigation loops can never interleave their key presses.
pub struct RokuDriver {
    session: Mutex<Session>,
    context: Mutex<DriverContext>,
    cancel: CancellationToken,
}

impl RokuDriver {
    /// Create a session over HTTP from W3C capabilities. Invalid
    /// capabilities are refused as InvalidArgument before the device is
    /// contacted.
    pub fn create_session(capabilities: Capabilities, mut settings: DriverSettings) -> Result<RokuDriver> {
        capabilities.validate()?;
        settings.apply_capabilities(&capabilities);
        let client = EcpClient::from_settings(&settings)
            .map_err(|e| DriverError::SessionNotCreated(e.to_string()))?;
        RokuDriver::start(client, capabilities, &settings)
    }

    /// Create a session over an already-built client.
    pub fn start(client: EcpClient, capabilities: Capabilities, settings: &DriverSettings) -> Result<RokuDriver> {
        let context = DriverContext::new(client, settings);
        let mut session = Session::new(capabilities);
        session.start(&context.client)?;
        info!(session = %session.id, "session active");

        let cancel = context.cancel.clone();
        Ok(RokuDriver {
            session: Mutex::new(session),
            context: Mutex::new(context),
            cancel,
        })
    }

    pub fn session_id(&self) -> String {
        self.lock_session().id.clone()
    }

    pub fn session_state(&self) -> SessionState {
        self.lock_session().state()
    }

    /// Token that aborts the running command before its next navigation move.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Return the device to the home screen, then drop session state.
    pub fn delete_session(&self) {
        let mut session = self.lock_session();
        let mut guard = self.lock_context();
        let ctx = &mut *guard;
        session.end(&ctx.client, || {
            ctx.cache.clear();
            ctx.snapshots.reset();
            ctx.current_context = NATIVE_CONTEXT.to_string();
        });
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_context(&self) -> MutexGuard<'_, DriverContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one command with exclusive access to the session context.
    pub fn with_context<T>(&self, command: impl FnOnce(&mut DriverContext) -> Result<T>) -> Result<T> {
        if !self.lock_session().is_active() {
            return Err(DriverError::InvalidArgument("session is not active".into()));
        }
        let mut ctx = self.lock_context();
        ctx.cancel.reset();
        command(&mut ctx)
    }
}

impl AutomationDriver for RokuDriver {
    fn find_element(&self, strategy: &str, selector: &str) -> Result<ElementHandle> {
        self.with_context(|ctx| element::find_element(ctx, strategy, selector, None))
    }

    fn find_elements(&self, strategy: &str, selector: &str) -> Result<Vec<ElementHandle>> {
        self.with_context(|ctx| element::find_elements(ctx, strategy, selector, None))
    }

    fn find_element_from_element(&self, parent: &ElementHandle, strategy: &str, selector: &str) -> Result<ElementHandle> {
        self.with_context(|ctx| element::find_element(ctx, strategy, selector, Some(parent)))
    }

    fn find_elements_from_element(&self, parent: &ElementHandle, strategy: &str, selector: &str) -> Result<Vec<ElementHandle>> {
        self.with_context(|ctx| element::find_elements(ctx, strategy, selector, Some(parent)))
    }

    fn active_element(&self) -> Result<ElementHandle> {
        self.with_context(element::active_element)
    }

    fn click(&self, el: &ElementHandle) -> Result<()> {
        self.with_context(|ctx| element::click(ctx, el))
    }

    fn set_value(&self, el: &ElementHandle, text: &str) -> Result<()> {
        self.with_context(|ctx| element::set_value(ctx, el, text))
    }

    fn clear(&self, el: &ElementHandle) -> Result<()> {
        self.with_context(|ctx| element::clear(ctx, el))
    }

    fn focus(&self, el: &ElementHandle) -> Result<usize> {
        self.with_context(|ctx| element::focus_element(ctx, el).map(|outcome| outcome.moves))
    }

    fn get_text(&self, el: &ElementHandle) -> Result<String> {
        self.with_context(|ctx| element::get_text(ctx, el))
    }

    fn get_attribute(&self, el: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.with_context(|ctx| element::get_attribute(ctx, el, name))
    }

    fn get_tag_name(&self, el: &ElementHandle) -> Result<String> {
        self.with_context(|ctx| element::get_tag_name(ctx, el))
    }

    fn get_element_rect(&self, el: &ElementHandle) -> Result<Option<Bounds>> {
        self.with_context(|ctx| element::get_element_rect(ctx, el))
    }

    fn is_displayed(&self, el: &ElementHandle) -> Result<bool> {
        self.with_context(|ctx| element::is_displayed(ctx, el))
    }

    fn is_focused(&self, el: &ElementHandle) -> Result<bool> {
        self.with_context(|ctx| element::is_focused(ctx, el))
    }

    fn get_page_source(&self) -> Result<String> {
        self.with_context(source::get_page_source)
    }

    fn get_screenshot(&self) -> Result<String> {
        self.with_context(source::get_screenshot)
    }

    fn get_current_context(&self) -> Result<String> {
        self.with_context(|ctx| Ok(source::get_current_context(ctx)))
    }

    fn get_contexts(&self) -> Result<Vec<String>> {
        self.with_context(|_| Ok(source::get_contexts()))
    }

    fn set_context(&self, name: &str) -> Result<()> {
        self.with_context(|ctx| source::set_context(ctx, name))
    }

    fn perform_actions(&self, actions_json: &Value) -> Result<()> {
        self.with_context(|ctx| actions::perform_actions(ctx, actions_json))
    }

    fn release_actions(&self) -> Result<()> {
        self.with_context(|_| Ok(()))
    }

    fn execute(&self, script: &str, args: &[Value]) -> Result<Value> {
        self.with_context(|ctx| execute::execute(ctx, script, args))
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.with_context(|ctx| device::press_key(ctx, key))
    }

    fn install_app(&self, path: &str) -> Result<()> {
        self.with_context(|ctx| device::install_app(ctx, path))
    }

    fn remove_app(&self, app_id: &str) -> Result<()> {
        self.with_context(|ctx| device::remove_app(ctx, app_id))
    }

    fn activate_app(&self, app_id: &str) -> Result<()> {
        self.with_context(|ctx| device::activate_app(ctx, app_id, &[]))
    }

    fn terminate_app(&self, app_id: &str) -> Result<bool> {
        self.with_context(|ctx| device::terminate_app(ctx, app_id))
    }

    fn is_app_installed(&self, app_id: &str) -> Result<bool> {
        self.with_context(|ctx| device::is_app_installed(ctx, app_id))
    }

    fn list_apps(&self) -> Result<Vec<AppInfo>> {
        self.with_context(|ctx| device::apps(ctx))
    }

    fn active_app(&self) -> Result<ActiveApp> {
        self.with_context(|ctx| device::active_app(ctx))
    }

    fn device_info(&self) -> Result<DeviceInfo> {
        self.with_context(|ctx| device::device_info(ctx))
    }

    fn player_state(&self) -> Result<PlayerState> {
        self.with_context(|ctx| device::player_state(ctx))
    }

    fn deep_link(&self, app_id: &str, content_id: &str, media_type: &str) -> Result<()> {
        self.with_context(|ctx| device::deep_link(ctx, app_id, content_id, media_type))
    }

    fn ecp_input(&self, params: &[(String, String)]) -> Result<()> {
        self.with_context(|ctx| device::ecp_input(ctx, params))
    }

    fn select_element(&self, attribute: &str, value: &str) -> Result<()> {
        self.with_context(|ctx| device::select_element(ctx, attribute, value))
    }

    fn ecp(&self, method: &str, path: &str, params: &[(String, String)]) -> Result<String> {
        self.with_context(|ctx| device::raw_ecp(ctx, method, path, params))
    }
}

//! Platform seams for the detection core
//!
//! The OS subsystems this crate reacts to — telephony state, posted
//! notifications, the accessibility node tree, synthetic input and the
//! permission/settings surfaces — are external collaborators. Each one is
//! modelled as a trait the embedder implements for its platform; the core
//! never talks to the OS directly, which keeps every monitor testable with
//! in-memory fakes.

use std::sync::Arc;

/// Failure at a platform boundary.
///
/// These never propagate past the strategy or scan step that hit them:
/// callers log, convert to a negative result and move on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    /// The handle was cancelled or recycled by the platform.
    #[error("handle is no longer valid")]
    StaleHandle,

    /// The capability does not exist on this platform or platform version.
    #[error("capability not supported on this platform")]
    Unsupported,

    /// The backing service exists but could not be reached right now.
    #[error("platform service unavailable: {0}")]
    Unavailable(String),
}

/// Screen-space rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Vertical centre of the rectangle, used by the lower-screen heuristic.
    pub fn center_y(&self) -> i32 {
        self.top + (self.bottom - self.top) / 2
    }
}

/// Display size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

/// An invocable handle attached to a notification (an action button or the
/// primary content intent).
///
/// Invocation may fail with [`PlatformError::StaleHandle`] when the platform
/// has already cancelled the underlying intent; callers treat that as a
/// strategy failure, never as a crash.
pub trait ActionHandle: Send + Sync {
    fn invoke(&self) -> Result<(), PlatformError>;
}

/// Programmatic control over native cellular calls.
pub trait TelephonyController: Send + Sync {
    /// Whether the elevated call-control privilege is held and the platform
    /// version exposes programmatic accept at all.
    fn supports_accept(&self) -> bool;

    /// Accept the currently ringing native call.
    fn accept_ringing_call(&self) -> Result<(), PlatformError>;
}

/// A leased handle into the foreground app's UI node tree.
///
/// Node handles are a limited resource borrowed from the OS per event.
/// Dropping the box returns the lease; the scanner never retains a node
/// beyond the scan that acquired it.
pub trait UiNode {
    fn class_name(&self) -> Option<String>;
    fn text(&self) -> Option<String>;
    fn content_description(&self) -> Option<String>;
    fn is_clickable(&self) -> bool;
    fn bounds_in_screen(&self) -> Rect;
    fn child_count(&self) -> usize;

    /// Lease the child at `index`. Returns `None` when the tree mutated
    /// under the scan or the child is gone.
    fn child(&self, index: usize) -> Option<Box<dyn UiNode>>;

    /// Perform the node's primary activation action. `Ok(true)` means the
    /// platform acknowledged the click.
    fn click(&self) -> Result<bool, PlatformError>;
}

/// On-demand access to the accessibility subsystem for the foreground app.
pub trait AccessibilityHost: Send + Sync {
    /// Lease the root node of the active window, if there is one.
    fn active_root(&self) -> Option<Box<dyn UiNode>>;

    /// Current display metrics. `None` when the window manager cannot be
    /// queried; geometry-based fallbacks degrade to no-ops in that case.
    fn screen_size(&self) -> Option<ScreenSize>;
}

/// Synthetic tap dispatch.
///
/// Taps are fire-and-forget: the platform reports completion/cancellation
/// asynchronously and the core only logs it.
pub trait GestureDispatcher: Send + Sync {
    /// Whether this platform exposes synthetic input dispatch at all.
    fn is_supported(&self) -> bool;

    fn dispatch_tap(&self, x: i32, y: i32) -> Result<(), PlatformError>;
}

/// The programmatically checkable readiness conditions.
///
/// `supports_battery_exemption` gates the battery step entirely on platform
/// versions that predate the setting.
pub trait PermissionGate: Send + Sync {
    fn runtime_permissions_granted(&self) -> bool;
    fn notification_listener_enabled(&self) -> bool;
    fn supports_battery_exemption(&self) -> bool;
    fn battery_exempt(&self) -> bool;
}

/// Fire-and-forget "attempt auto-answer now" signal into the accessibility
/// monitor. No acknowledgment; the receiver must tolerate the signal while
/// inactive (no-op) and while already mid-scan (queued behind it).
pub trait DelegateSignal: Send + Sync {
    fn request_auto_answer(&self);
}

/// One notification action as surfaced by the platform: a label plus the
/// handle that fires it.
#[derive(Clone)]
pub struct NotificationAction {
    pub label: String,
    pub handle: Arc<dyn ActionHandle>,
}

/// A posted notification, reduced to the fields the detection core reads.
#[derive(Clone, Default)]
pub struct NotificationRecord {
    /// Package name of the posting app.
    pub package: String,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Expanded ("big") text, when the notification carries one.
    pub big_text: Option<String>,
    pub sub_text: Option<String>,
    pub actions: Vec<NotificationAction>,
    /// The primary tap handle (content intent).
    pub content: Option<Arc<dyn ActionHandle>>,
}

impl NotificationRecord {
    /// All known text fields concatenated and lower-cased, ready for
    /// classification.
    pub fn combined_text(&self) -> String {
        let mut out = String::new();
        for field in [&self.title, &self.body, &self.big_text, &self.sub_text] {
            if let Some(text) = field {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(text);
            }
        }
        out.to_lowercase()
    }
}

impl std::fmt::Debug for NotificationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationRecord")
            .field("package", &self.package)
            .field("title", &self.title)
            .field("body", &self.body)
            .field("big_text", &self.big_text)
            .field("sub_text", &self.sub_text)
            .field("actions", &self.actions.len())
            .field("has_content", &self.content.is_some())
            .finish()
    }
}

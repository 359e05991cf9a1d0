//! UI tree scanning for incoming-call screens
//!
//! Stateless walks over the leased accessibility node tree: one to decide
//! whether the foreground surface is an incoming-call screen, one to find
//! and activate an answer control. Node handles are leased from the OS and
//! limited; every handle acquired here is a `Box<dyn UiNode>` that returns
//! its lease on drop, on every exit path, and is never retained across
//! scans. Both scans are idempotent and re-entrant.

use crate::classify::{classify_answer_label, classify_call_text, KeywordSets};
use crate::platform::{ScreenSize, UiNode};
use tracing::{debug, warn};

/// Recursion bound; real call screens are nowhere near this deep, and a
/// cyclic or pathological tree must not exhaust the node lease pool.
const MAX_SCAN_DEPTH: usize = 48;

/// Fraction of the screen height above which the geometric fallback ignores
/// controls (answer buttons sit in the lower 40%).
const LOWER_SCREEN_THRESHOLD: f32 = 0.60;

/// Class-name fragments that typically mark a tappable control.
const CLICKABLE_CLASS_MARKERS: &[&str] = &["Button", "ImageView", "ImageButton", "View"];

/// Class-name fragments that mark a call surface.
const CALL_CLASS_MARKERS: &[&str] = &["Call", "Voice", "Video"];

/// How the answer-control search concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSearch {
    /// A clickable node with an answer label was activated.
    AnswerLabel,
    /// Text matching failed but a clickable lower-screen control was
    /// activated.
    LowerScreen,
    /// Nothing could be activated; the caller falls through to the gesture
    /// fallback.
    NotFound,
}

impl ControlSearch {
    pub fn activated(self) -> bool {
        !matches!(self, ControlSearch::NotFound)
    }
}

/// Decide whether `root` is an incoming-call screen.
///
/// Precedence, first match wins: a node whose text contains "incoming"; a
/// node matching any call phrase; a root class name carrying a call marker.
pub fn find_incoming_call_indicator(root: &dyn UiNode, keywords: &KeywordSets) -> bool {
    if find_node(root, 0, &|node| {
        node_text(node).to_lowercase().contains("incoming")
    }) {
        return true;
    }

    if find_node(root, 0, &|node| {
        classify_call_text(&node_text(node), keywords)
    }) {
        return true;
    }

    if let Some(class_name) = root.class_name() {
        if CALL_CLASS_MARKERS.iter().any(|m| class_name.contains(m)) {
            debug!("Call surface detected from root class {class_name}");
            return true;
        }
    }

    false
}

/// Find and activate an answer control.
///
/// First a depth-first pass for a clickable node whose text or description
/// matches an answer keyword; then, when display metrics are available, a
/// pass for any clickable button-ish node in the lower screen region.
pub fn find_and_activate_answer_control(
    root: &dyn UiNode,
    keywords: &KeywordSets,
    screen: Option<ScreenSize>,
) -> ControlSearch {
    if activate_node(root, 0, &|node| {
        classify_answer_label(&node_text(node), keywords)
    }) {
        return ControlSearch::AnswerLabel;
    }

    let Some(screen) = screen else {
        debug!("No display metrics, skipping lower-screen heuristic");
        return ControlSearch::NotFound;
    };
    if screen.height <= 0 {
        return ControlSearch::NotFound;
    }

    let cutoff = (screen.height as f32 * LOWER_SCREEN_THRESHOLD) as i32;
    if activate_node(root, 0, &|node| is_likely_answer_button(node, cutoff)) {
        return ControlSearch::LowerScreen;
    }

    ControlSearch::NotFound
}

/// Text and content description of a node, joined. A failed read is just an
/// empty string; one bad node never aborts the scan.
fn node_text(node: &dyn UiNode) -> String {
    let mut out = node.text().unwrap_or_default();
    if let Some(description) = node.content_description() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&description);
    }
    out
}

/// Button-ish class in the lower screen region by vertical centre.
fn is_likely_answer_button(node: &dyn UiNode, cutoff_y: i32) -> bool {
    let Some(class_name) = node.class_name() else {
        return false;
    };
    if !CLICKABLE_CLASS_MARKERS.iter().any(|m| class_name.contains(m)) {
        return false;
    }
    node.bounds_in_screen().center_y() > cutoff_y
}

/// Depth-first search for any node matching `predicate`. Child leases are
/// dropped as each subtree is left.
fn find_node(node: &dyn UiNode, depth: usize, predicate: &dyn Fn(&dyn UiNode) -> bool) -> bool {
    if depth >= MAX_SCAN_DEPTH {
        warn!("UI scan depth bound hit, truncating branch");
        return false;
    }
    if predicate(node) {
        return true;
    }
    for index in 0..node.child_count() {
        // A vanished child mid-scan is a transient platform error: skip it.
        let Some(child) = node.child(index) else {
            continue;
        };
        if find_node(child.as_ref(), depth + 1, predicate) {
            return true;
        }
    }
    false
}

/// Depth-first search for a clickable node matching `predicate`, activating
/// the first one whose click the platform acknowledges. A refused or failed
/// click keeps the search going.
fn activate_node(node: &dyn UiNode, depth: usize, predicate: &dyn Fn(&dyn UiNode) -> bool) -> bool {
    if depth >= MAX_SCAN_DEPTH {
        warn!("UI scan depth bound hit, truncating branch");
        return false;
    }
    if node.is_clickable() && predicate(node) {
        match node.click() {
            Ok(true) => {
                debug!("Activated answer control {:?}", node.class_name());
                return true;
            }
            Ok(false) => debug!("Click not acknowledged, continuing search"),
            Err(e) => debug!("Click failed ({e}), continuing search"),
        }
    }
    for index in 0..node.child_count() {
        let Some(child) = node.child(index) else {
            continue;
        };
        if activate_node(child.as_ref(), depth + 1, predicate) {
            return true;
        }
    }
    false
}

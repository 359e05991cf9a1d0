//! Callpilot - Incoming-call detection and best-effort auto-answer
//!
//! Watches three independent signal sources (native telephony state, posted
//! notifications, accessibility UI events) for incoming calls from a target
//! messaging app and answers them through a layered strategy chain. A setup
//! readiness chain gates when the pipeline may run at all.
//!
//! The OS-facing surfaces live behind the traits in [`platform`]; embedders
//! implement those and forward raw signals into a [`service::DetectionService`].

pub mod accessibility_monitor;
pub mod auto_answer;
pub mod classify;
pub mod config;
pub mod delay;
pub mod event;
pub mod flags;
pub mod gesture;
pub mod logging;
pub mod notification_monitor;
pub mod platform;
pub mod readiness;
pub mod scanner;
pub mod service;
pub mod telephony_monitor;

//! Passive-learning playback sessions
//!
//! This module provides:
//! - Session configuration and the persisted session record
//! - The session engine state machine (idle, active, paused)
//! - Events published as playback progresses

pub mod engine;
pub mod events;
pub mod models;

pub use engine::{SessionEngine, SessionError};
pub use events::SessionEvent;
pub use models::*;

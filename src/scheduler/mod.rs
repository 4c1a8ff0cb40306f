//! SM-2 scheduling for vocabulary items
//!
//! This module provides:
//! - The spaced repetition record embedded in each item
//! - The pure SM-2 interval calculator
//! - Due/new/learned query helpers for stores

pub mod algorithm;
pub mod models;

pub use algorithm::{advance, create_initial, graduate, is_due, is_learned, is_new};
pub use models::*;

//! Vocabulary items and their persistence
//!
//! This module provides:
//! - The vocabulary pair model
//! - The store contract with JSON file and in-memory backends
//! - Manual review, reset and progress queries

pub mod models;
pub mod review;
pub mod storage;

pub use models::*;
pub use review::{add_item, due_items, progress_summary, reset_item, review_item, update_item};
pub use storage::{JsonVocabularyStore, MemoryVocabularyStore, StoreError, VocabularyStore};

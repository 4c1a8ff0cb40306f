pub mod clock;
pub mod config;
pub mod scheduler;
pub mod session;
pub mod speech;
pub mod vocabulary;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use session::{SessionConfig, SessionEngine, SessionError, SessionEvent};
pub use vocabulary::{JsonVocabularyStore, VocabularyItem, VocabularyStore};

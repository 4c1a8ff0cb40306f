pub mod add;
pub mod config;
pub mod due;
pub mod list;
pub mod play;
pub mod review;
pub mod sessions;
pub mod stats;

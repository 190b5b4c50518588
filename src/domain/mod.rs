//! Core domain types: compression levels, file records, plans

pub mod file;
pub mod level;
pub mod plan;

pub use file::{FileRecord, SourceFile};
pub use level::{CompressionLevel, MIN_COMPRESSED_TOKENS};
pub use plan::{FileReport, Plan, RunReport};

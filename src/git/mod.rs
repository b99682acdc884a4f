//! Git change extraction and the records it produces.

pub mod analyzer;
pub mod change;
pub mod error;
pub mod repository;

pub use analyzer::GitAnalyzer;
pub use change::{ChangeKind, DiffAnalysis, FileChange, RepositoryMetadata};
pub use error::AnalysisError;
pub use repository::GitRepository;

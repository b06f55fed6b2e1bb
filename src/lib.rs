pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod library;
pub mod logging;
pub mod model;
pub mod parsing;
pub mod pattern;
pub mod query;
pub mod rules;
pub mod types;
pub mod utils;

pub use cache::AstCache;
pub use config::Settings;
pub use error::{AstCacheError, AstCacheResult};
pub use model::{AstNode, AstRelationship, Language, LibraryNode, LibraryRelationship, NodeKind};
pub use pattern::CompiledPattern;

//! Tool tree for toolframe: config sources merged by priority, loaded lazily,
//! and resolved from command-line words.
//!
//! Sources are registered with a [`Loader`] and only read when a lookup needs
//! the part of the tree they can contribute to. A source is either a single
//! config file or a directory, where:
//! - `<word>.json` / `<word>.toml` defines the tool `<word>`,
//! - a subdirectory `<word>/` defines the namespace `<word>` and everything below it,
//! - `.toolframe.{json,toml}` defines the directory's own tool,
//! - `.preload.{json,toml}` and `.lib/` add directories to the tool search path.

pub mod builder;
pub mod definition;
pub mod error;
pub mod loader;
pub mod search_path;
pub mod source;
pub mod tree;

pub use definition::{Alias, Entry, ToolDefinition};
pub use error::LoadError;
pub use loader::{ListOptions, Loader, Resolved, Subtool, SubtoolKind};
pub use search_path::SearchPath;
pub use source::{ConfigSource, DirLayout};
pub use tree::{ConfigTree, NAMESPACE_PRIORITY, PLACEHOLDER_PRIORITY};

//! `yamlcfg` is a "document-oriented" parser and API for a practical subset
//! of YAML: mappings, block and flow sequences, quoted and plain scalars,
//! and comments. Unlike serde-based implementations, it preserves formatting
//! when editing, so human-maintained configuration files survive repeated
//! machine edits without unrelated changes.
//!
//! Anchors, aliases, tags, block scalars and multi-document streams are out
//! of scope. If you need those and don't care about formatting, reach for a
//! full YAML implementation instead.
//!
//! ## Example
//!
//! ```rust
//! use yamlcfg::YamlDocument;
//!
//! let doc_str = r#"# Database access
//! Database:
//!   User: "user"
//!   Password: password # change me
//!   Hosts:
//!   - db1
//!   - db2
//! Ports: [ 5432, 5433 ]
//! "#;
//!
//! let doc: YamlDocument = doc_str.parse().expect("failed to parse document");
//!
//! assert_eq!(doc.get_string("Database.User").unwrap(), "user");
//! assert_eq!(doc.get_string_list("Database.Hosts").unwrap(), vec!["db1", "db2"]);
//! assert_eq!(doc.get_number_list::<u16>("Ports").unwrap(), vec![5432, 5433]);
//!
//! // Documents fully roundtrip:
//! assert_eq!(doc.to_string(), doc_str);
//! ```
//!
//! ## Editing
//!
//! Keys are `.`-joined paths. Setting a key that exists updates it in place
//! and leaves everything else byte-identical. Missing keys are created, next
//! to siblings they share a prefix with. A numeric last segment addresses a
//! list item.
//!
//! ```rust
//! let mut doc: yamlcfg::YamlDocument = "Database:\n  Password: password # change me\n".parse()?;
//!
//! doc.set("Database.Password", "P@SS#WORD")?;
//! doc.set("Database.Port", 5432)?;
//!
//! assert_eq!(
//!     doc.to_string(),
//!     "Database:\n  Password: \"P@SS#WORD\" # change me\n  Port: 5432\n"
//! );
//! # Ok::<(), yamlcfg::YamlError>(())
//! ```
//!
//! Strings get quotes as soon as they contain anything outside
//! `[A-Za-z0-9_.-]`, preferring `"` unless the text contains `"` but no `'`.
//! Numbers and booleans are written bare. `Vec`s become block lists, fixed
//! size arrays flow lists, and [`SetValue`] spells out either explicitly.
//!
//! ## Error Reporting
//!
//! [`YamlParseError`] implements [`miette::Diagnostic`] and can be used to
//! display detailed, pretty-printed diagnostic messages when using
//! [`miette::Result`] and the `"fancy"` feature flag for `miette`:
//!
//! ```toml
//! # Cargo.toml
//! [dependencies]
//! miette = { version = "x.y.z", features = ["fancy"] }
//! ```
//!
//! ```no_run
//! fn main() -> miette::Result<()> {
//!     "list: [ a, [b] ]".parse::<yamlcfg::YamlDocument>()?;
//!     Ok(())
//! }
//! ```
//!
//! This will display a message like:
//! ```text
//! Error:
//!   × Mismatched brackets in flow sequence (line 1)
//!    ╭────
//!  1 │ list: [ a, [b] ]
//!    · ────────┬───────
//!    ·         ╰── bracket mismatch
//!    ╰────
//!   help: Flow sequences cannot nest and close with a single `]`.
//! ```
//!
//! ## Quirks
//!
//! ### Comments
//!
//! A `#` only starts a comment at the beginning of a value or after
//! whitespace, so `a#b` is a plain value. Values that need a literal ` #`
//! must be quoted, which [`YamlDocument::set`] does on its own.
//!
//! ### Line breaks in single quotes
//!
//! A single-quoted value folded across a blank line keeps a line break,
//! which single quotes cannot carry. It is written back double-quoted, so
//! after a reload [`YamlValue::quote`] reports [`Quote::Double`] where the
//! original said [`Quote::Single`]. Text and output are unaffected.
//!
//! ```rust
//! let doc: yamlcfg::YamlDocument = "k: 'a\n\n  b'\n".parse()?;
//! assert_eq!(doc.get_string("k")?, "a\n b");
//! assert_eq!(doc.to_string(), "k: \"a\\n b\"\n");
//! # Ok::<(), yamlcfg::YamlError>(())
//! ```
//!
//! ### Logging
//!
//! Loading, indexing and section extraction log through [`tracing`] at
//! `debug` level, every read line and `set` at `trace`. No subscriber is
//! installed by this crate.
//!
//! ## License
//!
//! The code in this repository is covered by [the Apache-2.0
//! License](LICENSE.md).

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub, rust_2018_idioms)]

pub use document::*;
pub use error::*;
pub use key::*;
pub use node::*;
pub use reader::ParseOptions;
pub use tree::*;
pub use value::*;

mod document;
mod error;
mod fmt;
mod getters;
mod index;
mod key;
mod node;
mod parser;
mod reader;
mod tree;
mod value;

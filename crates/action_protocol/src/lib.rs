//! Parser for the artifact action protocol emitted by site-generating models.
//!
//! A model turn embeds directives such as
//!
//! ```text
//! <boltArtifact id="app" title="Project Files">
//!   <boltAction type="file" filePath="src/main.tsx">...</boltAction>
//!   <boltAction type="shell">npm install</boltAction>
//! </boltArtifact>
//! ```
//!
//! [`ProtocolParser::parse`] recovers them as an ordered list of
//! [`ActionToken`]s. Failures are local to a single directive and reported as
//! [`ParseError`]s next to the tokens; a parse pass never aborts.

mod attributes;
mod error;
mod parser;
mod path;
mod token;

pub use error::{ParseError, ParseErrorKind};
pub use parser::{
    parse, ArtifactHeader, ParseReport, ParserOptions, ProtocolParser, DEFAULT_ACTION_TAG,
    DEFAULT_ARTIFACT_TAG,
};
pub use path::{PathError, ProjectPath};
pub use token::{Action, ActionKind, ActionToken};

//! Deterministic project trees from the artifact action protocol.
//!
//! A model turn is parsed into ordered [`ActionToken`]s, folded into the
//! session's [`ArtifactTree`], and projected on demand into a
//! [`MountDescriptor`] for an in-browser virtual filesystem.
//!
//! Invariant: the tree is only mutated by merge cycles, and one cycle runs at a
//! time per session ([`SharedSession::cycle`] holds the lock across parse and
//! merge).
//!
//! # Public API Overview
//! - [`GenerationSession`] owns the tree for one generation session: scaffold
//!   seeding, complete turns, streamed turns, step log, reset.
//! - [`parse`] / [`ProtocolParser`] and [`merge`] are re-exported for hosts that
//!   manage their own state.
//! - [`ForgeConfig`] reads delimiter and logging settings from the environment;
//!   [`init_logging`] installs a tracing subscriber.

pub mod config;
pub mod logging;
pub mod session;

/// Protocol parsing.
pub use action_protocol::{
    parse, Action, ActionKind, ActionToken, ArtifactHeader, ParseError, ParseErrorKind,
    ParseReport, ParserOptions, PathError, ProjectPath, ProtocolParser,
};

/// Tree state, merging and mount projection.
pub use artifact_tree::{
    merge, project, ArtifactTree, Change, EntryKind, FileContents, MergeRejection, MergeReport,
    MountDescriptor, MountEntry, Node, NodeId, NodeKind, Outcome, StreamCursor, TokenOutcome,
};

pub use crate::config::{ConfigError, ForgeConfig};
pub use crate::logging::init_logging;
pub use crate::session::{
    GenerationSession, SharedSession, Step, StepOrigin, StepStatus, TurnReport,
};

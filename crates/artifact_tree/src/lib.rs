//! Canonical project tree built by folding parsed action tokens.
//!
//! - [`ArtifactTree`] owns every node in an arena and indexes them by full path.
//! - [`merge`] / [`ArtifactTree::apply`] fold a batch of tokens into the tree and
//!   report a per-token [`Outcome`]. Batches are not transactional.
//! - [`StreamCursor`] commits the tokens of a streamed response exactly once.
//! - [`project`] produces the [`MountDescriptor`] handed to a virtual filesystem mount.

mod merge;
mod mount;
mod node;
mod stream;
mod tree;

pub use merge::{merge, Change, MergeRejection, MergeReport, Outcome, TokenOutcome};
pub use mount::{project, FileContents, MountDescriptor, MountEntry};
pub use node::{EntryKind, Node, NodeId, NodeKind};
pub use stream::StreamCursor;
pub use tree::{ArtifactTree, Walk};

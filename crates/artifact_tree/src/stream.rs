use action_protocol::ParseReport;
use tracing::debug;

use crate::merge::MergeReport;
use crate::tree::ArtifactTree;

/// Merge-side bookkeeping for one streamed model turn.
///
/// The parser is re-run on ever longer prefixes of the same response. The
/// cursor remembers which directive sequences were already committed so each
/// closed directive reaches the tree exactly once. A trailing directive whose
/// end marker has not arrived yet is held back until [`StreamCursor::finish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamCursor {
    next_sequence: usize,
}

impl StreamCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First directive sequence not committed yet.
    #[must_use]
    pub fn next_sequence(&self) -> usize {
        self.next_sequence
    }

    /// Commits closed, not yet committed tokens of a prefix parse.
    pub fn advance(&mut self, tree: &mut ArtifactTree, prefix: &ParseReport) -> MergeReport {
        self.commit(tree, prefix, false)
    }

    /// Commits everything left in the final parse, unterminated tokens included.
    pub fn finish(mut self, tree: &mut ArtifactTree, full: &ParseReport) -> MergeReport {
        self.commit(tree, full, true)
    }

    fn commit(&mut self, tree: &mut ArtifactTree, report: &ParseReport, finished: bool) -> MergeReport {
        let pending: Vec<_> = report
            .tokens()
            .filter(|token| token.sequence >= self.next_sequence)
            .take_while(|token| finished || token.closed)
            .collect();

        if let Some(last) = pending.last() {
            self.next_sequence = last.sequence + 1;
        }
        debug!(
            committed = pending.len(),
            next_sequence = self.next_sequence,
            finished,
            "advanced stream cursor"
        );

        tree.apply(pending)
    }
}

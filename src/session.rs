//! Per-session generation state: one tree folded across every model turn.

use std::sync::{Arc, Mutex, MutexGuard};

use action_protocol::{
    ActionKind, ParseError, ParseReport, ParserOptions, ProjectPath, ProtocolParser,
};
use artifact_tree::{
    project, ArtifactTree, MergeReport, MountDescriptor, Outcome, StreamCursor, TokenOutcome,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ForgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", content = "turn", rename_all = "snake_case")]
pub enum StepOrigin {
    Scaffold,
    Turn(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed(String),
}

/// One progress entry per parsed directive, failed ones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: usize,
    #[serde(flatten)]
    pub origin: StepOrigin,
    pub title: String,
    pub description: String,
    pub kind: Option<ActionKind>,
    pub path: Option<ProjectPath>,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Everything one parse-then-merge cycle produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub origin: StepOrigin,
    pub parse_errors: Vec<ParseError>,
    pub merge: MergeReport,
}

impl TurnReport {
    #[must_use]
    pub fn outcomes(&self) -> &[TokenOutcome] {
        self.merge.outcomes()
    }
}

#[derive(Debug, Default)]
struct StreamState {
    cursor: StreamCursor,
    merged: MergeReport,
    received: String,
}

/// Generation session owning the canonical [`ArtifactTree`].
///
/// Every entry point runs one complete cycle synchronously; callers never see a
/// half-merged batch.
#[derive(Debug)]
pub struct GenerationSession {
    parser: ProtocolParser,
    tree: ArtifactTree,
    steps: Vec<Step>,
    turns: usize,
    stream: Option<StreamState>,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new(&ParserOptions::default())
    }
}

impl GenerationSession {
    #[must_use]
    pub fn new(options: &ParserOptions) -> Self {
        Self {
            parser: ProtocolParser::new(options),
            tree: ArtifactTree::new(),
            steps: Vec::new(),
            turns: 0,
            stream: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(&config.parser_options())
    }

    /// Applies the project scaffold that precedes the first model turn.
    pub fn seed_scaffold(&mut self, text: &str) -> TurnReport {
        let parsed = self.parser.parse(text);
        let merge = self.tree.apply(parsed.tokens());
        self.finish_cycle(StepOrigin::Scaffold, &parsed, merge)
    }

    /// Parses and merges one complete model turn.
    ///
    /// A streamed turn still in flight is closed out first as its own turn:
    /// directives it already committed are logged as completed steps, the rest
    /// as skipped.
    pub fn ingest_turn(&mut self, text: &str) -> TurnReport {
        self.abandon_stream();
        self.turns += 1;
        let parsed = self.parser.parse(text);
        let merge = self.tree.apply(parsed.tokens());
        self.finish_cycle(StepOrigin::Turn(self.turns), &parsed, merge)
    }

    /// Folds the closed directives of a partially received turn.
    ///
    /// `prefix` is the whole response received so far. Directives already
    /// committed by an earlier call are not applied again.
    pub fn stream_update(&mut self, prefix: &str) -> MergeReport {
        let parsed = self.parser.parse(prefix);
        let state = self.stream.get_or_insert_with(StreamState::default);
        let merged = state.cursor.advance(&mut self.tree, &parsed);
        state.merged.append(merged.clone());
        prefix.clone_into(&mut state.received);
        merged
    }

    /// Completes a streamed turn with its full text.
    pub fn stream_finish(&mut self, text: &str) -> TurnReport {
        let parsed = self.parser.parse(text);
        let StreamState {
            cursor, mut merged, ..
        } = self.stream.take().unwrap_or_default();
        merged.append(cursor.finish(&mut self.tree, &parsed));
        self.turns += 1;
        self.finish_cycle(StepOrigin::Turn(self.turns), &parsed, merged)
    }

    #[must_use]
    pub fn tree(&self) -> &ArtifactTree {
        &self.tree
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Completed model turns, scaffold excluded.
    #[must_use]
    pub fn turns(&self) -> usize {
        self.turns
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    #[must_use]
    pub fn mount_descriptor(&self) -> MountDescriptor {
        project(&self.tree)
    }

    /// Starts a new session with the same parser.
    pub fn reset(&mut self) {
        self.tree.reset();
        self.steps.clear();
        self.turns = 0;
        self.stream = None;
    }

    fn abandon_stream(&mut self) -> Option<TurnReport> {
        let StreamState {
            merged, received, ..
        } = self.stream.take()?;
        let parsed = self.parser.parse(&received);
        self.turns += 1;
        warn!(
            turn = self.turns,
            committed = merged.outcomes().len(),
            "abandoned streamed turn"
        );
        Some(self.finish_cycle(StepOrigin::Turn(self.turns), &parsed, merged))
    }

    fn finish_cycle(&mut self, origin: StepOrigin, parsed: &ParseReport, merge: MergeReport) -> TurnReport {
        for directive in parsed.directives() {
            let id = self.steps.len() + 1;
            let step = match directive {
                Ok(token) => {
                    let status = merge
                        .outcomes()
                        .iter()
                        .find(|outcome| outcome.sequence == token.sequence)
                        .map_or(StepStatus::Skipped, |outcome| step_status(&outcome.status));
                    Step {
                        id,
                        origin,
                        title: token.title.clone(),
                        description: token.description.clone(),
                        kind: Some(token.kind()),
                        path: token.path().cloned(),
                        status,
                    }
                }
                Err(error) => Step {
                    id,
                    origin,
                    title: "Unreadable directive".to_string(),
                    description: String::new(),
                    kind: None,
                    path: None,
                    status: StepStatus::Failed(error.kind.to_string()),
                },
            };
            self.steps.push(step);
        }

        let parse_errors: Vec<ParseError> = parsed.errors().cloned().collect();
        info!(
            ?origin,
            tokens = merge.outcomes().len(),
            parse_errors = parse_errors.len(),
            applied = merge.applied_count(),
            rejected = merge.rejected().count(),
            nodes = self.tree.len(),
            "merged model turn"
        );

        TurnReport {
            origin,
            parse_errors,
            merge,
        }
    }
}

fn step_status(outcome: &Outcome) -> StepStatus {
    match outcome {
        Outcome::Applied(_) => StepStatus::Completed,
        Outcome::NoOp => StepStatus::Skipped,
        Outcome::Rejected(reason) => StepStatus::Failed(reason.to_string()),
    }
}

/// Session handle for multi-threaded hosts.
///
/// The lock is held for a whole parse-then-merge cycle; the tree has exactly
/// one writer at a time.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<GenerationSession>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: GenerationSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Runs `cycle` with exclusive access to the session.
    pub fn cycle<R>(&self, cycle: impl FnOnce(&mut GenerationSession) -> R) -> R {
        let mut guard = lock_unpoisoned(&self.inner);
        cycle(&mut guard)
    }

    pub fn ingest_turn(&self, text: &str) -> TurnReport {
        self.cycle(|session| session.ingest_turn(text))
    }

    /// Copy of the current tree, detached from later merges.
    #[must_use]
    pub fn snapshot(&self) -> ArtifactTree {
        self.cycle(|session| session.tree().clone())
    }

    #[must_use]
    pub fn mount_descriptor(&self) -> MountDescriptor {
        self.cycle(|session| session.mount_descriptor())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::{GenerationSession, StepOrigin, StepStatus};

    #[test]
    fn failed_directives_become_failed_steps() {
        let mut session = GenerationSession::default();
        let report = session.ingest_turn(concat!(
            r#"<boltAction type="file" filePath="a.txt">a</boltAction>"#,
            r#"<boltAction type="teleport" filePath="b.txt">b</boltAction>"#,
        ));

        assert_eq!(report.parse_errors.len(), 1);
        let steps = session.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert!(matches!(steps[1].status, StepStatus::Failed(ref reason) if reason.contains("teleport")));
        assert_eq!(steps[1].origin, StepOrigin::Turn(1));
    }

    #[test]
    fn ingest_closes_out_abandoned_stream() {
        let mut session = GenerationSession::default();
        session.stream_update(concat!(
            r#"<boltAction type="file" filePath="a.txt">a</boltAction>"#,
            r#"<boltAction type="file" filePath="b.txt">partial"#,
        ));
        let report = session.ingest_turn(r#"<boltAction type="file" filePath="c.txt">c</boltAction>"#);

        assert!(!session.is_streaming());
        assert_eq!(report.origin, StepOrigin::Turn(2));
        assert_eq!(session.turns(), 2);

        let steps = session.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].origin, StepOrigin::Turn(1));
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[1].status, StepStatus::Skipped);
        assert_eq!(steps[2].origin, StepOrigin::Turn(2));

        assert!(session.tree().lookup("a.txt").is_some());
        assert!(session.tree().lookup("b.txt").is_none());
        assert!(session.tree().lookup("c.txt").is_some());
    }

    #[test]
    fn reset_forgets_everything() {
        let mut session = GenerationSession::default();
        session.ingest_turn(r#"<boltAction type="file" filePath="a.txt">a</boltAction>"#);
        session.reset();

        assert!(session.tree().is_empty());
        assert!(session.steps().is_empty());
        assert_eq!(session.turns(), 0);
    }
}

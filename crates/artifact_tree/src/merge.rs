use action_protocol::{Action, ActionKind, ActionToken, ProjectPath};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::node::{EntryKind, NodeId, NodeKind};
use crate::tree::ArtifactTree;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MergeRejection {
    #[error("'{path}' is a {found}, expected a {expected}")]
    PathKindConflict {
        path: ProjectPath,
        expected: EntryKind,
        found: EntryKind,
    },

    #[error("directory '{path}' still has {children} entries")]
    NotEmpty { path: ProjectPath, children: usize },

    #[error("the project root cannot be targeted")]
    RootPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Created,
    Updated,
    Removed,
    /// Script handed to the external executor; the tree is untouched.
    Scheduled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Applied(Change),
    NoOp,
    Rejected(MergeRejection),
}

impl Outcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied(_) => "applied",
            Self::NoOp => "noop",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// What happened to one token of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenOutcome {
    pub sequence: usize,
    pub kind: ActionKind,
    pub path: Option<ProjectPath>,
    pub title: String,
    #[serde(flatten)]
    pub status: Outcome,
}

/// Per-batch result of [`merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    outcomes: Vec<TokenOutcome>,
    materialized: Vec<ProjectPath>,
    scripts: Vec<String>,
}

impl MergeReport {
    #[must_use]
    pub fn outcomes(&self) -> &[TokenOutcome] {
        &self.outcomes
    }

    /// Directories created implicitly as parents of other tokens' paths.
    #[must_use]
    pub fn materialized(&self) -> &[ProjectPath] {
        &self.materialized
    }

    /// Commands of `RunScript` tokens, in batch order.
    #[must_use]
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_applied())
            .count()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &TokenOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_rejected())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Appends a later report of the same turn, keeping batch order.
    pub fn append(&mut self, later: MergeReport) {
        self.outcomes.extend(later.outcomes);
        self.materialized.extend(later.materialized);
        self.scripts.extend(later.scripts);
    }
}

/// Folds `tokens` into `tree` and returns the new state with per-token outcomes.
pub fn merge(mut tree: ArtifactTree, tokens: &[ActionToken]) -> (ArtifactTree, MergeReport) {
    let report = tree.apply(tokens);
    (tree, report)
}

impl ArtifactTree {
    /// Applies tokens in `sequence` order.
    ///
    /// Each token succeeds or fails on its own: a rejection leaves the tree as it
    /// was before that token and never undoes earlier tokens of the batch.
    pub fn apply<'a>(&mut self, tokens: impl IntoIterator<Item = &'a ActionToken>) -> MergeReport {
        let mut ordered: Vec<&ActionToken> = tokens.into_iter().collect();
        ordered.sort_by_key(|token| token.sequence);

        let mut report = MergeReport::default();
        for token in ordered {
            let status = self.apply_action(&token.action, &mut report);
            match &status {
                Outcome::Rejected(reason) => warn!(
                    sequence = token.sequence,
                    kind = %token.kind(),
                    %reason,
                    "rejected action"
                ),
                other => debug!(
                    sequence = token.sequence,
                    kind = %token.kind(),
                    path = token.path().map(ProjectPath::as_str).unwrap_or(""),
                    outcome = other.label(),
                    "merged action"
                ),
            }

            report.outcomes.push(TokenOutcome {
                sequence: token.sequence,
                kind: token.kind(),
                path: token.path().cloned(),
                title: token.title.clone(),
                status,
            });
        }

        report
    }

    fn apply_action(&mut self, action: &Action, report: &mut MergeReport) -> Outcome {
        if action.path().is_some_and(ProjectPath::is_root) {
            return Outcome::Rejected(MergeRejection::RootPath);
        }

        match action {
            Action::CreateFile { path, content } | Action::EditFile { path, content } => {
                self.write_file(path, content, &mut report.materialized)
            }
            Action::CreateFolder { path } => self.create_folder(path, &mut report.materialized),
            Action::DeleteFile { path } => self.delete(path),
            Action::RunScript { command } => {
                report.scripts.push(command.clone());
                Outcome::Applied(Change::Scheduled)
            }
        }
    }

    fn write_file(
        &mut self,
        path: &ProjectPath,
        content: &str,
        materialized: &mut Vec<ProjectPath>,
    ) -> Outcome {
        if let Some(id) = self.id_of(path) {
            let Some(node) = self.node_mut(id) else {
                return Outcome::NoOp;
            };
            return match &mut node.kind {
                NodeKind::File { content: existing } if existing.as_str() == content => Outcome::NoOp,
                NodeKind::File { content: existing } => {
                    content.clone_into(existing);
                    Outcome::Applied(Change::Updated)
                }
                NodeKind::Directory { .. } => Outcome::Rejected(MergeRejection::PathKindConflict {
                    path: path.clone(),
                    expected: EntryKind::File,
                    found: EntryKind::Directory,
                }),
            };
        }

        let parent = match self.ensure_parents(path, materialized) {
            Ok(parent) => parent,
            Err(rejection) => return Outcome::Rejected(rejection),
        };
        self.insert_child(
            parent,
            path.clone(),
            NodeKind::File {
                content: content.to_string(),
            },
        );
        Outcome::Applied(Change::Created)
    }

    fn create_folder(&mut self, path: &ProjectPath, materialized: &mut Vec<ProjectPath>) -> Outcome {
        if let Some(existing) = self.get(path) {
            return if existing.is_dir() {
                Outcome::NoOp
            } else {
                Outcome::Rejected(MergeRejection::PathKindConflict {
                    path: path.clone(),
                    expected: EntryKind::Directory,
                    found: EntryKind::File,
                })
            };
        }

        let parent = match self.ensure_parents(path, materialized) {
            Ok(parent) => parent,
            Err(rejection) => return Outcome::Rejected(rejection),
        };
        self.insert_child(
            parent,
            path.clone(),
            NodeKind::Directory {
                children: Vec::new(),
            },
        );
        Outcome::Applied(Change::Created)
    }

    fn delete(&mut self, path: &ProjectPath) -> Outcome {
        let Some(node) = self.get(path) else {
            return Outcome::NoOp;
        };

        let children = node.child_ids().len();
        if children > 0 {
            return Outcome::Rejected(MergeRejection::NotEmpty {
                path: path.clone(),
                children,
            });
        }

        let id = node.id();
        self.remove_leaf(id);
        Outcome::Applied(Change::Removed)
    }

    /// Resolves the parent directory of `path`, creating missing ancestors.
    ///
    /// All ancestors are checked before anything is created, so a file in the
    /// way rejects the token without leaving half-built directories behind.
    fn ensure_parents(
        &mut self,
        path: &ProjectPath,
        materialized: &mut Vec<ProjectPath>,
    ) -> Result<NodeId, MergeRejection> {
        let ancestors = path.ancestors();

        if let Some(blocking) = ancestors
            .iter()
            .find(|ancestor| self.get(ancestor).is_some_and(|node| node.is_file()))
        {
            return Err(MergeRejection::PathKindConflict {
                path: blocking.clone(),
                expected: EntryKind::Directory,
                found: EntryKind::File,
            });
        }

        let mut parent = self.root_id();
        for ancestor in ancestors {
            parent = match self.id_of(&ancestor) {
                Some(existing) => existing,
                None => {
                    let created = self.insert_child(
                        parent,
                        ancestor.clone(),
                        NodeKind::Directory {
                            children: Vec::new(),
                        },
                    );
                    debug!(path = ancestor.as_str(), "materialized parent directory");
                    materialized.push(ancestor);
                    created
                }
            };
        }

        Ok(parent)
    }
}

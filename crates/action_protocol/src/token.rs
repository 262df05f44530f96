use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::path::ProjectPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateFile,
    CreateFolder,
    EditFile,
    DeleteFile,
    RunScript,
}

impl ActionKind {
    /// Maps a protocol `type` attribute value onto a kind.
    #[must_use]
    pub fn from_protocol(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::CreateFile),
            "folder" | "directory" => Some(Self::CreateFolder),
            "edit" => Some(Self::EditFile),
            "delete" => Some(Self::DeleteFile),
            "shell" => Some(Self::RunScript),
            _ => None,
        }
    }

    #[must_use]
    pub fn requires_path(self) -> bool {
        !matches!(self, Self::RunScript)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CreateFile => "create-file",
            Self::CreateFolder => "create-folder",
            Self::EditFile => "edit-file",
            Self::DeleteFile => "delete-file",
            Self::RunScript => "run-script",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    CreateFile { path: ProjectPath, content: String },
    CreateFolder { path: ProjectPath },
    EditFile { path: ProjectPath, content: String },
    DeleteFile { path: ProjectPath },
    RunScript { command: String },
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateFile { .. } => ActionKind::CreateFile,
            Self::CreateFolder { .. } => ActionKind::CreateFolder,
            Self::EditFile { .. } => ActionKind::EditFile,
            Self::DeleteFile { .. } => ActionKind::DeleteFile,
            Self::RunScript { .. } => ActionKind::RunScript,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&ProjectPath> {
        match self {
            Self::CreateFile { path, .. }
            | Self::CreateFolder { path }
            | Self::EditFile { path, .. }
            | Self::DeleteFile { path } => Some(path),
            Self::RunScript { .. } => None,
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::CreateFile { content, .. } | Self::EditFile { content, .. } => Some(content),
            Self::RunScript { command } => Some(command),
            Self::CreateFolder { .. } | Self::DeleteFile { .. } => None,
        }
    }

    /// Display title used when the directive carries none.
    #[must_use]
    pub fn default_title(&self) -> String {
        match self {
            Self::CreateFile { path, .. } => format!("Create {path}"),
            Self::CreateFolder { path } => format!("Create folder {path}"),
            Self::EditFile { path, .. } => format!("Edit {path}"),
            Self::DeleteFile { path } => format!("Delete {path}"),
            Self::RunScript { .. } => "Run command".to_string(),
        }
    }
}

/// One successfully parsed directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionToken {
    pub sequence: usize,
    #[serde(flatten)]
    pub action: Action,
    pub title: String,
    pub description: String,
    #[serde(skip)]
    pub span: Range<usize>,
    /// False only for a trailing directive whose end marker has not arrived.
    pub closed: bool,
}

impl ActionToken {
    #[must_use]
    pub fn new(sequence: usize, action: Action) -> Self {
        let title = action.default_title();
        Self {
            sequence,
            action,
            title,
            description: String::new(),
            span: 0..0,
            closed: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    #[must_use]
    pub fn path(&self) -> Option<&ProjectPath> {
        self.action.path()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.action.payload()
    }
}

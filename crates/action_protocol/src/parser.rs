use std::ops::Range;

use tracing::{debug, warn};

use crate::attributes::{attribute, parse_attributes, Attributes};
use crate::error::{ParseError, ParseErrorKind};
use crate::path::ProjectPath;
use crate::token::{Action, ActionKind, ActionToken};

pub const DEFAULT_ACTION_TAG: &str = "boltAction";
pub const DEFAULT_ARTIFACT_TAG: &str = "boltArtifact";

const KIND_ATTRIBUTE: &str = "type";
const PATH_ATTRIBUTES: [&str; 2] = ["filePath", "path"];
const TITLE_ATTRIBUTE: &str = "title";

/// Delimiter tag names of the action protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub action_tag: String,
    pub artifact_tag: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            action_tag: DEFAULT_ACTION_TAG.to_string(),
            artifact_tag: DEFAULT_ARTIFACT_TAG.to_string(),
        }
    }
}

/// Opening artifact wrapper seen during a parse pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub id: Option<String>,
    pub title: Option<String>,
    pub offset: usize,
}

/// Result of one parse pass: every directive in source order, failed or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    directives: Vec<Result<ActionToken, ParseError>>,
    artifacts: Vec<ArtifactHeader>,
}

impl ParseReport {
    #[must_use]
    pub fn directives(&self) -> &[Result<ActionToken, ParseError>] {
        &self.directives
    }

    pub fn tokens(&self) -> impl Iterator<Item = &ActionToken> {
        self.directives.iter().filter_map(|entry| entry.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ParseError> {
        self.directives.iter().filter_map(|entry| entry.as_ref().err())
    }

    #[must_use]
    pub fn into_tokens(self) -> Vec<ActionToken> {
        self.directives.into_iter().filter_map(Result::ok).collect()
    }

    #[must_use]
    pub fn artifacts(&self) -> &[ArtifactHeader] {
        &self.artifacts
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    #[must_use]
    pub fn has_unterminated(&self) -> bool {
        self.tokens().any(|token| !token.closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    ActionOpen,
    ArtifactOpen,
    ArtifactClose,
}

/// Scanner for the flat action protocol.
///
/// Parsing is pure: the same text always yields the same report, and a longer
/// prefix of a streamed response only ever extends or closes what a shorter
/// prefix produced.
#[derive(Debug, Clone)]
pub struct ProtocolParser {
    action_open: String,
    action_close: String,
    artifact_open: String,
    artifact_close: String,
}

impl Default for ProtocolParser {
    fn default() -> Self {
        Self::new(&ParserOptions::default())
    }
}

impl ProtocolParser {
    #[must_use]
    pub fn new(options: &ParserOptions) -> Self {
        Self {
            action_open: format!("<{}", options.action_tag),
            action_close: format!("</{}>", options.action_tag),
            artifact_open: format!("<{}", options.artifact_tag),
            artifact_close: format!("</{}>", options.artifact_tag),
        }
    }

    pub fn parse(&self, text: &str) -> ParseReport {
        let mut report = ParseReport::default();
        let mut description = String::new();
        let mut sequence = 0usize;
        let mut cursor = 0usize;

        while let Some((start, marker)) = self.next_marker(text, cursor) {
            match marker {
                Marker::ArtifactClose => {
                    description.clear();
                    cursor = start + self.artifact_close.len();
                }
                Marker::ArtifactOpen => {
                    let attrs_start = start + self.artifact_open.len();
                    let limit = self.next_marker_start(text, attrs_start);
                    let Some(tag_end) = find_tag_end(text, attrs_start, limit.unwrap_or(text.len()))
                    else {
                        let Some(resume) = limit else {
                            debug!(offset = start, "artifact wrapper still streaming");
                            break;
                        };
                        warn!(offset = start, "ignoring unterminated artifact wrapper");
                        cursor = resume;
                        continue;
                    };
                    let attributes = parse_attributes(strip_self_close(&text[attrs_start..tag_end]))
                        .unwrap_or_else(|detail| {
                            warn!(offset = start, %detail, "ignoring malformed artifact attributes");
                            Attributes::new()
                        });
                    let header = ArtifactHeader {
                        id: attribute(&attributes, "id").map(ToString::to_string),
                        title: attribute(&attributes, TITLE_ATTRIBUTE).map(ToString::to_string),
                        offset: start,
                    };
                    description = header.title.clone().unwrap_or_default();
                    report.artifacts.push(header);
                    cursor = tag_end + 1;
                }
                Marker::ActionOpen => {
                    let directive_sequence = sequence;
                    sequence += 1;

                    let attrs_start = start + self.action_open.len();
                    let limit = self.next_marker_start(text, attrs_start);
                    let Some(tag_end) = find_tag_end(text, attrs_start, limit.unwrap_or(text.len()))
                    else {
                        let Some(resume) = limit else {
                            let error = ParseError::new(
                                directive_sequence,
                                start..text.len(),
                                ParseErrorKind::TruncatedMarker,
                            );
                            debug!(sequence = directive_sequence, "start marker still streaming");
                            report.directives.push(Err(error));
                            break;
                        };
                        let error = ParseError::new(
                            directive_sequence,
                            start..resume,
                            ParseErrorKind::MalformedAttribute {
                                detail: "start marker is not closed before the next marker".to_string(),
                            },
                        );
                        warn!(%error, "skipping malformed directive");
                        report.directives.push(Err(error));
                        cursor = resume;
                        continue;
                    };

                    let raw_attrs = &text[attrs_start..tag_end];
                    let self_closing = raw_attrs.trim_end().ends_with('/');
                    let body_start = tag_end + 1;
                    let (body_end, resume, closed) = if self_closing {
                        (body_start, body_start, true)
                    } else {
                        self.find_body_end(text, body_start)
                    };

                    let directive = build_directive(
                        directive_sequence,
                        start..resume,
                        strip_self_close(raw_attrs),
                        trim_single_newlines(&text[body_start..body_end]),
                        closed,
                        &description,
                    );
                    match &directive {
                        Ok(token) => debug!(
                            sequence = token.sequence,
                            kind = %token.kind(),
                            path = token.path().map(ProjectPath::as_str).unwrap_or(""),
                            closed = token.closed,
                            "parsed directive"
                        ),
                        Err(error) => warn!(%error, "skipping malformed directive"),
                    }
                    report.directives.push(directive);
                    cursor = resume;
                }
            }
        }

        report
    }

    /// Earliest protocol marker at or after `from`.
    fn next_marker(&self, text: &str, from: usize) -> Option<(usize, Marker)> {
        [
            (find_open_marker(text, from, &self.action_open), Marker::ActionOpen),
            (find_open_marker(text, from, &self.artifact_open), Marker::ArtifactOpen),
            (find_from(text, from, &self.artifact_close), Marker::ArtifactClose),
        ]
        .into_iter()
        .filter_map(|(position, marker)| position.map(|position| (position, marker)))
        .min_by_key(|(position, _)| *position)
    }

    fn next_marker_start(&self, text: &str, from: usize) -> Option<usize> {
        self.next_marker(text, from).map(|(position, _)| position)
    }

    /// Returns `(payload_end, resume_at, closed)` for a payload starting at `from`.
    ///
    /// A following start marker or the artifact end marker closes the directive
    /// implicitly; without any marker the rest of the text is the payload.
    fn find_body_end(&self, text: &str, from: usize) -> (usize, usize, bool) {
        let explicit = find_from(text, from, &self.action_close);
        let implicit = [
            find_open_marker(text, from, &self.action_open),
            find_from(text, from, &self.artifact_close),
        ]
        .into_iter()
        .flatten()
        .min();

        match (explicit, implicit) {
            (Some(close), Some(next)) if next < close => (next, next, true),
            (Some(close), _) => (close, close + self.action_close.len(), true),
            (None, Some(next)) => (next, next, true),
            (None, None) => (text.len(), text.len(), false),
        }
    }
}

/// Parses `text` with the default delimiters.
pub fn parse(text: &str) -> ParseReport {
    ProtocolParser::default().parse(text)
}

fn build_directive(
    sequence: usize,
    span: Range<usize>,
    raw_attrs: &str,
    payload: &str,
    closed: bool,
    description: &str,
) -> Result<ActionToken, ParseError> {
    let fail = |kind: ParseErrorKind| ParseError::new(sequence, span.clone(), kind);

    let attributes =
        parse_attributes(raw_attrs).map_err(|detail| fail(ParseErrorKind::MalformedAttribute { detail }))?;
    let kind_value =
        attribute(&attributes, KIND_ATTRIBUTE).ok_or_else(|| fail(ParseErrorKind::MissingKind))?;
    let kind = ActionKind::from_protocol(kind_value).ok_or_else(|| {
        fail(ParseErrorKind::UnknownKind {
            kind: kind_value.to_string(),
        })
    })?;

    let require_path = || -> Result<ProjectPath, ParseError> {
        let raw = PATH_ATTRIBUTES
            .iter()
            .find_map(|name| attribute(&attributes, name))
            .ok_or_else(|| {
                fail(ParseErrorKind::MissingPath {
                    kind: kind.label().to_string(),
                })
            })?;
        ProjectPath::parse(raw).map_err(|error| fail(ParseErrorKind::from_path_error(kind.label(), error)))
    };

    let action = match kind {
        ActionKind::CreateFile => Action::CreateFile {
            path: require_path()?,
            content: payload.to_string(),
        },
        ActionKind::CreateFolder => Action::CreateFolder {
            path: require_path()?,
        },
        ActionKind::EditFile => Action::EditFile {
            path: require_path()?,
            content: payload.to_string(),
        },
        ActionKind::DeleteFile => Action::DeleteFile {
            path: require_path()?,
        },
        ActionKind::RunScript => Action::RunScript {
            command: payload.to_string(),
        },
    };

    let mut token = ActionToken::new(sequence, action).with_description(description);
    if let Some(title) = attribute(&attributes, TITLE_ATTRIBUTE).filter(|title| !title.trim().is_empty()) {
        token.title = title.to_string();
    }
    token.span = span;
    token.closed = closed;
    Ok(token)
}

fn find_from(text: &str, from: usize, needle: &str) -> Option<usize> {
    text.get(from..)?.find(needle).map(|offset| from + offset)
}

/// Finds `<tag` followed by whitespace, `>`, `/` or the end of the text, so that
/// `<boltActionX` is not mistaken for a marker.
fn find_open_marker(text: &str, from: usize, marker: &str) -> Option<usize> {
    let mut search = from;
    while let Some(position) = find_from(text, search, marker) {
        let after = position + marker.len();
        match text[after..].chars().next() {
            None | Some('>') | Some('/') => return Some(position),
            Some(c) if c.is_whitespace() => return Some(position),
            Some(_) => search = after,
        }
    }
    None
}

/// Index of the `>` ending a start marker, skipping quoted attribute values.
///
/// The search stops at `limit`, the next protocol marker, so an unbalanced
/// quote cannot swallow later directives.
fn find_tag_end(text: &str, from: usize, limit: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, c) in text.get(from..limit)?.char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + offset),
            (None, _) => {}
        }
    }
    None
}

fn strip_self_close(raw_attrs: &str) -> &str {
    let trimmed = raw_attrs.trim_end();
    trimmed.strip_suffix('/').unwrap_or(raw_attrs)
}

fn trim_single_newlines(payload: &str) -> &str {
    let payload = payload
        .strip_prefix("\r\n")
        .or_else(|| payload.strip_prefix('\n'))
        .unwrap_or(payload);
    payload
        .strip_suffix("\r\n")
        .or_else(|| payload.strip_suffix('\n'))
        .unwrap_or(payload)
}

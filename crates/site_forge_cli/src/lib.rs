//! `site-forge`: fold saved model turns into a project tree.
//!
//! Turn files are applied in command-line order to one session, after the
//! optional scaffold. A turn path of `-` reads the turn from stdin; with no
//! turn paths at all, stdin is the only turn.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use site_forge::config::{validate_tag, ACTION_TAG_ENV, ARTIFACT_TAG_ENV};
use site_forge::{ForgeConfig, GenerationSession, Outcome, TurnReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per directive: status, kind, path
    Outcomes,
    /// Indented file listing of the final tree
    Tree,
    /// Virtual filesystem mount descriptor as JSON
    Mount,
    /// Parse errors and merge outcomes of every turn as JSON
    Report,
}

#[derive(Debug, Parser)]
#[command(name = "site-forge")]
#[command(version, about = "Fold model responses into a deterministic project tree", long_about = None)]
pub struct Cli {
    /// Model turn files, applied in order (`-` for stdin)
    pub turns: Vec<PathBuf>,

    /// Scaffold directives applied before the first turn
    #[arg(long)]
    pub scaffold: Option<PathBuf>,

    /// What to print once every turn is merged
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Outcomes)]
    pub output: OutputFormat,

    /// Directive tag name
    #[arg(long)]
    pub action_tag: Option<String>,

    /// Artifact wrapper tag name
    #[arg(long)]
    pub artifact_tag: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Layers command-line overrides on top of the environment configuration.
    pub fn apply_to(&self, mut config: ForgeConfig) -> Result<ForgeConfig> {
        if let Some(tag) = &self.action_tag {
            config.action_tag = Some(validate_tag(ACTION_TAG_ENV, tag)?);
        }
        if let Some(tag) = &self.artifact_tag {
            config.artifact_tag = Some(validate_tag(ARTIFACT_TAG_ENV, tag)?);
        }
        if self.verbose {
            config.log_filter = Some("debug".to_string());
        }
        Ok(config)
    }
}

/// Runs one invocation against explicit streams.
pub fn run(cli: &Cli, config: &ForgeConfig, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<()> {
    let mut session = GenerationSession::from_config(config);
    let mut reports = Vec::new();

    if let Some(path) = &cli.scaffold {
        let text = read_input(path, stdin)?;
        reports.push(session.seed_scaffold(&text));
    }

    if cli.turns.is_empty() {
        let text = read_input(Path::new("-"), stdin)?;
        reports.push(session.ingest_turn(&text));
    }
    for path in &cli.turns {
        let text = read_input(path, stdin)?;
        reports.push(session.ingest_turn(&text));
    }

    match cli.output {
        OutputFormat::Outcomes => write_outcomes(&reports, stdout)?,
        OutputFormat::Tree => stdout.write_all(session.tree().render_listing().as_bytes())?,
        OutputFormat::Mount => {
            let json = session
                .mount_descriptor()
                .to_json_pretty()
                .context("failed to serialize mount descriptor")?;
            writeln!(stdout, "{json}")?;
        }
        OutputFormat::Report => {
            serde_json::to_writer_pretty(&mut *stdout, &reports).context("failed to serialize report")?;
            writeln!(stdout)?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn read_input(path: &Path, stdin: &mut dyn Read) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("failed to read turn from stdin")?;
        return Ok(text);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_outcomes(reports: &[TurnReport], stdout: &mut dyn Write) -> Result<()> {
    for report in reports {
        for error in &report.parse_errors {
            writeln!(stdout, "error #{} {}", error.sequence, error.kind)?;
        }
        for outcome in report.outcomes() {
            let target = outcome
                .path
                .as_ref()
                .map_or_else(|| outcome.title.clone(), ToString::to_string);
            match &outcome.status {
                Outcome::Rejected(reason) => writeln!(
                    stdout,
                    "{} {} {target}: {reason}",
                    outcome.status.label(),
                    outcome.kind
                )?,
                status => writeln!(stdout, "{} {} {target}", status.label(), outcome.kind)?,
            }
        }
        for script in report.merge.scripts() {
            writeln!(stdout, "script {script}")?;
        }
    }
    Ok(())
}

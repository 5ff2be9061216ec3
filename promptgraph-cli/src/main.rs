// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Promptgraph CLI
//!
//! Offline tooling over JSON prompt documents: validate one, diff two, or
//! preview how one would merge onto another.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promptgraph_core::{ContentModel, EngineConfig, MergePolicy};
use promptgraph_storage::version_git::{
    ChangeType, DiffConfig, DiffEngine, DiffResult, FieldChange, MergeEngine,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "promptgraph")]
#[command(author, version, about = "Promptgraph - prompt version tooling", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, env = "PROMPTGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a file is a well-formed prompt document
    Validate {
        /// Prompt document (JSON)
        file: PathBuf,
    },

    /// Structural diff between two prompt documents
    Diff {
        /// "Before" document
        a: PathBuf,

        /// "After" document
        b: PathBuf,

        /// Attach line diffs to modified messages
        #[arg(long)]
        line_diff: bool,
    },

    /// Show the result of merging `source` onto `target` without saving it
    MergePreview {
        /// Document merged into
        target: PathBuf,

        /// Document whose changes are applied
        source: PathBuf,

        /// Merge policy (source_wins, reject_conflicts)
        #[arg(long)]
        policy: Option<MergePolicy>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "promptgraph=debug,promptgraph_storage=debug,promptgraph_core=debug"
    } else {
        "promptgraph=info,promptgraph_storage=info,promptgraph_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = EngineConfig::load(cli.config.clone()).context("Failed to load configuration")?;
    debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Validate { file } => {
            let content = read_document(&file)?;
            info!(file = %file.display(), digest = %content.short_digest(), "Validated document");

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "valid": true,
                        "digest": content.digest(),
                        "messages": content.messages().len(),
                        "parameters": content.parameters().len(),
                        "inputVariables": content.input_variables().len(),
                        "fields": content.scalar_fields().len(),
                    }))?
                );
            } else {
                println!("✓ {} is a valid prompt document", file.display());
                println!("  Digest:          {}", content.short_digest());
                println!("  Messages:        {}", content.messages().len());
                println!("  Parameters:      {}", content.parameters().len());
                println!("  Input variables: {}", content.input_variables().len());
                println!("  Other fields:    {}", content.scalar_fields().len());
            }
        }

        Commands::Diff { a, b, line_diff } => {
            let before = read_document(&a)?;
            let after = read_document(&b)?;

            let mut settings = config.diff.clone();
            settings.line_diff |= line_diff;
            let engine = DiffEngine::with_config(DiffConfig::from(&settings));
            let diff = engine.compare(&before, &after);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                print_diff(&diff, &a, &b);
            }
        }

        Commands::MergePreview {
            target,
            source,
            policy,
        } => {
            let target_content = read_document(&target)?;
            let source_content = read_document(&source)?;

            let policy = policy.unwrap_or(config.merge.policy);
            let engine = MergeEngine::with_policy(policy);
            let outcome = engine
                .merge_content(&target_content, &source_content)
                .with_context(|| format!("Merge refused under policy {}", policy))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "policy": policy.to_string(),
                        "content": outcome.content.to_document(),
                        "added": outcome.added,
                        "overridden": outcome.overridden,
                        "keptFromTarget": outcome.kept_from_target,
                    }))?
                );
            } else {
                println!("Merge preview ({})", policy);
                print_paths("Added from source", &outcome.added);
                print_paths("Overridden by source", &outcome.overridden);
                print_paths("Kept from target", &outcome.kept_from_target);
                println!();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome.content.to_document())?
                );
            }
        }
    }

    Ok(())
}

fn read_document(path: &Path) -> Result<ContentModel> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    ContentModel::from_document(&value)
        .with_context(|| format!("{} is not a prompt document", path.display()))
}

fn marker(change: ChangeType) -> char {
    match change {
        ChangeType::Added => '+',
        ChangeType::Removed => '-',
        ChangeType::Modified => '~',
    }
}

fn print_diff(diff: &DiffResult, a: &Path, b: &Path) {
    if diff.is_empty() {
        println!("No differences");
        return;
    }

    for change in &diff.changes {
        match change {
            FieldChange::Messages { diff: entries, .. } => {
                for entry in entries {
                    println!("{} messages[{}]", marker(entry.change), entry.index);
                    if let Some(content_diff) = &entry.content_diff {
                        let old_path = format!("{}#messages[{}]", a.display(), entry.index);
                        let new_path = format!("{}#messages[{}]", b.display(), entry.index);
                        print!("{}", content_diff.to_unified(&old_path, &new_path));
                    }
                }
            }
            FieldChange::Parameters { diff: entries, .. } => {
                for entry in entries {
                    println!(
                        "{} parameters.{}: {} -> {}",
                        marker(entry.change),
                        entry.key,
                        show(entry.version1.as_ref().map(|v| v.to_json())),
                        show(entry.version2.as_ref().map(|v| v.to_json())),
                    );
                }
            }
            FieldChange::InputVariables { diff: entries, .. } => {
                for entry in entries {
                    println!("{} inputVariables.{}", marker(entry.change), entry.key);
                }
            }
            FieldChange::Scalar {
                field,
                change,
                version1,
                version2,
            } => {
                println!(
                    "{} {}: {} -> {}",
                    marker(*change),
                    field,
                    show(version1.as_ref().map(|v| v.to_json())),
                    show(version2.as_ref().map(|v| v.to_json())),
                );
            }
        }
    }

    let total = &diff.summary.total;
    println!();
    println!(
        "{} added, {} modified, {} removed",
        total.added, total.modified, total.removed
    );
}

fn show(value: Option<serde_json::Value>) -> String {
    value.map_or_else(|| "(none)".to_string(), |v| v.to_string())
}

fn print_paths(title: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    println!("  {}:", title);
    for path in paths {
        println!("    {}", path);
    }
}

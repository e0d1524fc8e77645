//! CLI definition and command dispatch for docdrop.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to their handlers.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--server`, `--token`)
//! 2. Environment variables (`DOCDROP_SERVER`, `DOCDROP_TOKEN`, `DOCDROP_CONFIG`)
//! 3. Config file (`~/.docdrop/config.yaml` or path from `--config`/`DOCDROP_CONFIG`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use docdrop_core::{
    feed_channel, read_feed_events, DashboardSession, DashboardSnapshot, DocdropConfig, DropEntry,
    DropError, FileStatus, FileStatusPhase, HttpTransport, StagingManager, StagingState,
    StatusAggregator, TaskPoller,
};

use crate::ui::{format, table, ColorMode, MessageType, Progress, ProgressMode, Style};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// docdrop – upload dashboard for a document server
#[derive(Parser, Debug)]
#[command(name = "docdrop")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "DOCDROP_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "DOCDROP_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.docdrop/config.yaml)
    #[arg(long, global = true, env = "DOCDROP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "DOCDROP_COLOR", default_value = "auto")]
    pub color: String,

    /// Document server URL (overrides server.url)
    #[arg(long, global = true, env = "DOCDROP_SERVER")]
    pub server: Option<String>,

    /// API token (overrides server.token)
    #[arg(long, global = true, env = "DOCDROP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory holding the staging area (default: current directory)
    #[arg(long, global = true, env = "DOCDROP_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drop files: upload them now, or stage them when stage mode is on
    #[command(after_help = r#"EXAMPLES:
    # Upload two files and watch until the server has consumed them
    docdrop upload invoice.pdf receipt.jpg

    # Upload every file in a folder
    docdrop upload scans/

    # Stage instead of uploading (same as `docdrop stage`)
    docdrop upload --stage page-1.pdf page-2.pdf
"#)]
    Upload {
        /// Files or directories to drop
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Stage the files instead of uploading them
        #[arg(long)]
        stage: bool,

        /// Return once the files are handed to the server
        #[arg(long)]
        no_watch: bool,

        /// Output the final dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append files to the staging area
    #[command(after_help = r#"EXAMPLES:
    # Stage pages in merge order
    docdrop stage page-1.pdf page-2.pdf page-3.pdf

    # Stage and name the merged document
    docdrop stage cover.pdf --name "Contract 2024.pdf"
"#)]
    Stage {
        /// Files or directories to stage
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Name of the merged document
        #[arg(long)]
        name: Option<String>,
    },

    /// List staged entries in merge order
    #[command(after_help = r#"EXAMPLES:
    docdrop staged
    docdrop staged --json
"#)]
    Staged {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Move a staged entry to another position
    #[command(after_help = r#"EXAMPLES:
    # Make the third entry the first one
    docdrop mv 2 0
"#)]
    Mv {
        /// Current index (see `docdrop staged`)
        from: usize,

        /// New index
        to: usize,
    },

    /// Remove one entry from the staging area
    #[command(after_help = r#"EXAMPLES:
    docdrop unstage 1
"#)]
    Unstage {
        /// Index of the entry (see `docdrop staged`)
        index: usize,
    },

    /// Submit all staged entries
    #[command(after_help = r#"EXAMPLES:
    # Merge staged pages into one document
    docdrop commit --merge --name "Scanned letter.pdf"

    # Submit staged files as separate documents
    docdrop commit
"#)]
    Commit {
        /// Merge the staged files into a single document
        #[arg(long)]
        merge: bool,

        /// Name of the merged document (only used with --merge)
        #[arg(long)]
        name: Option<String>,

        /// Return once the files are handed to the server
        #[arg(long)]
        no_watch: bool,

        /// Output the final dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the dashboard for a recorded status feed (JSONL)
    #[command(after_help = r#"EXAMPLES:
    # Show the dashboard after all recorded events
    docdrop replay events.jsonl

    # Only failed records
    docdrop replay events.jsonl --phase failed

    # Drop finished records first, output JSON
    docdrop replay events.jsonl --dismiss-completed --json
"#)]
    Replay {
        /// Event file, one JSON event per line
        events: PathBuf,

        /// Remove successful and failed records before rendering
        #[arg(long)]
        dismiss_completed: bool,

        /// Only list records in this phase
        #[arg(long, value_parser = parse_phase)]
        phase: Option<FileStatusPhase>,

        /// Also list records beyond the visible limit
        #[arg(long)]
        all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show docdrop configuration
    #[command(after_help = r#"EXAMPLES:
    docdrop config show
    docdrop config show --json
    docdrop config path
"#)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (token masked)
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the configuration file path
    Path,
}

fn parse_phase(s: &str) -> Result<FileStatusPhase, String> {
    s.parse()
}

/// Resolved settings shared by all handlers.
struct Context {
    style: Style,
    config: DocdropConfig,
    config_path: Option<PathBuf>,
    workspace: PathBuf,
    quiet: bool,
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// # Returns
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always, debug only with --verbose. Logs go to stderr so
    // --json output stays parseable.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!("docdrop_core={},docdrop_cli={}", log_level, log_level);
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = cli.color.parse::<ColorMode>().unwrap_or_else(|e| {
        tracing::warn!("{}", e);
        ColorMode::Auto
    });
    let style = Style::new(color_mode);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your config at ~/.docdrop/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to load configuration",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    let ctx = Context {
        style,
        config,
        config_path: cli.config.clone().or_else(DocdropConfig::default_path),
        workspace: cli.workspace.clone(),
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Command::Upload {
            paths,
            stage,
            no_watch,
            json,
        } => handle_upload(&ctx, paths, stage, no_watch, json),
        Command::Stage { paths, name } => handle_stage(&ctx, paths, name),
        Command::Staged { json } => handle_staged(&ctx, json),
        Command::Mv { from, to } => handle_mv(&ctx, from, to),
        Command::Unstage { index } => handle_unstage(&ctx, index),
        Command::Commit {
            merge,
            name,
            no_watch,
            json,
        } => handle_commit(&ctx, merge, name, no_watch, json),
        Command::Replay {
            events,
            dismiss_completed,
            phase,
            all,
            json,
        } => handle_replay(&ctx, &events, dismiss_completed, phase, all, json),
        Command::Config { action } => handle_config(&ctx, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.to_string();
            eprintln!(
                "{}",
                ctx.style.error_with_context(&message, None, hint_for(&e))
            );
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<DocdropConfig, DropError> {
    let mut config = match &cli.config {
        Some(path) => DocdropConfig::from_path(path)?,
        None => DocdropConfig::load_default()?,
    };

    let overridden = cli.server.is_some() || cli.token.is_some();
    if let Some(url) = &cli.server {
        config.server.url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.server.token = Some(token.clone());
    }
    if overridden {
        for warning in config.validate()? {
            tracing::debug!("Config warning after overrides: {}", warning);
        }
    }
    Ok(config)
}

fn hint_for(error: &DropError) -> Option<&'static str> {
    match error {
        DropError::IndexOutOfRange { .. } => Some("Run `docdrop staged` to see valid indices"),
        DropError::EmptyStaging => Some("Stage files with `docdrop stage <paths>`"),
        DropError::ServerStatus { status: 401 | 403, .. } => {
            Some("Check server.token or pass --token")
        }
        DropError::StagingParse(_) => Some("Remove .docdrop/staging.json to start over"),
        _ => None,
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Build a session over the persisted staging area.
fn open_session(
    ctx: &Context,
) -> Result<(DashboardSession<HttpTransport>, TaskPoller), DropError> {
    let (tx, rx) = feed_channel();
    let transport = HttpTransport::new(&ctx.config.server, tx.clone())?;
    let poller = TaskPoller::new(&ctx.config.server, tx)?;

    let aggregator = StatusAggregator::new(
        ctx.config.dashboard.max_visible,
        ctx.config.summary_messages(),
    );
    let staging = StagingManager::from_state(transport, StagingState::load(&ctx.workspace)?);
    Ok((DashboardSession::new(aggregator, staging, rx), poller))
}

fn resolve_entries(paths: &[PathBuf]) -> Result<Vec<DropEntry>, DropError> {
    paths.iter().map(|p| DropEntry::from_path(p)).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), DropError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wait for submitted uploads and render the final dashboard.
fn finish_submission(
    ctx: &Context,
    mut session: DashboardSession<HttpTransport>,
    poller: &TaskPoller,
    no_watch: bool,
    json: bool,
) -> Result<(), DropError> {
    let mode = ProgressMode::detect(ctx.quiet, json);

    if no_watch {
        let spinner = Progress::spinner("Uploading...", mode);
        session.staging().transport().join_workers();
        spinner.finish_clear();
    } else {
        let progress = Progress::upload_bar(mode);
        let settled = session.watch(Some(poller), &ctx.config.poll, |aggregator| {
            progress.set_ratio(aggregator.aggregate_upload_progress());
            progress.set_message(&aggregator.summary_text());
        });
        progress.finish_clear();
        session.staging().transport().join_workers();

        if !settled && mode != ProgressMode::Silent {
            println!(
                "{}",
                ctx.style.message(
                    MessageType::Warn,
                    &format!(
                        "Stopped watching after {}s; the server keeps processing",
                        ctx.config.poll.max_wait_secs
                    )
                )
            );
        }
    }

    let snapshot = session.shutdown();
    if json {
        return print_json(&snapshot);
    }
    render_dashboard(&ctx.style, &snapshot, false);
    Ok(())
}

fn render_dashboard(style: &Style, snapshot: &DashboardSnapshot, show_hidden: bool) {
    if snapshot.visible.is_empty() {
        println!("{}", style.message(MessageType::Info, "No uploads"));
        return;
    }

    println!("{}", style.section("UPLOADS"));
    println!("{}", table::render_status_table(&snapshot.visible, style));

    if !snapshot.hidden.is_empty() {
        if show_hidden {
            println!();
            println!("{}", style.section("EARLIER"));
            println!("{}", table::render_status_table(&snapshot.hidden, style));
        } else {
            println!(
                "{}",
                style.dim(&format!("  ... and {} more", snapshot.hidden.len()))
            );
        }
    }

    println!();
    let msg_type = if snapshot.counts.failed > 0 {
        MessageType::Warn
    } else if snapshot.counts.not_completed() > 0 {
        MessageType::Info
    } else {
        MessageType::Ok
    };
    println!("{}", style.message(msg_type, &snapshot.summary));
    if snapshot.counts.uploading > 0 {
        println!(
            "{}",
            style.message_detail("Uploaded", &format::format_percent(snapshot.upload_progress))
        );
    }
}

fn print_staged(style: &Style, staging: &StagingState) {
    println!("{}", style.section("STAGED (merge order)"));
    println!("{}", table::render_staged_table(&staging.entries));
    if !staging.merged_name.is_empty() {
        println!(
            "{}",
            style.message_detail("Merged name", &style.file_name(&staging.merged_name))
        );
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_upload(
    ctx: &Context,
    paths: Vec<PathBuf>,
    stage: bool,
    no_watch: bool,
    json: bool,
) -> Result<(), DropError> {
    if stage || ctx.config.staging.merge_staged_files {
        return handle_stage(ctx, paths, None);
    }

    let entries = resolve_entries(&paths)?;
    let (mut session, poller) = open_session(ctx)?;
    // Direct drops bypass staging; the persisted staging area is not saved here.
    session.staging_mut().set_merge_staged_files(false);
    session.drop_files(entries)?;

    finish_submission(ctx, session, &poller, no_watch, json)
}

fn handle_stage(ctx: &Context, paths: Vec<PathBuf>, name: Option<String>) -> Result<(), DropError> {
    let entries = resolve_entries(&paths)?;
    let count = entries.len();

    let (mut session, _poller) = open_session(ctx)?;
    {
        let staging = session.staging_mut();
        staging.set_merge_staged_files(true);
        if let Some(name) = name {
            staging.set_merged_name(name);
        }
    }
    session.drop_files(entries)?;
    let state = session.staging().state();
    state.save(&ctx.workspace)?;

    if !ctx.quiet {
        println!(
            "{}",
            ctx.style.message(
                MessageType::Ok,
                &format!(
                    "Staged {} ({} total)",
                    format::plural(count, "entry"),
                    state.entries.len()
                )
            )
        );
        println!(
            "{}",
            ctx.style.message(
                MessageType::Hint,
                "Run `docdrop commit --merge` to submit them as one document"
            )
        );
    }
    Ok(())
}

fn handle_staged(ctx: &Context, json: bool) -> Result<(), DropError> {
    let state = StagingState::load(&ctx.workspace)?;
    if json {
        return print_json(&state);
    }

    if state.entries.is_empty() {
        println!("{}", ctx.style.message(MessageType::Info, "Nothing staged"));
        return Ok(());
    }
    print_staged(&ctx.style, &state);
    Ok(())
}

fn handle_mv(ctx: &Context, from: usize, to: usize) -> Result<(), DropError> {
    let (mut session, _poller) = open_session(ctx)?;
    session.staging_mut().reorder(from, to)?;
    let state = session.staging().state();
    state.save(&ctx.workspace)?;

    let name = state.entries[to].name().to_string();
    println!(
        "{}",
        ctx.style.message(
            MessageType::Ok,
            &format!("Moved {} from {} to {}", ctx.style.file_name(&name), from, to)
        )
    );
    if !ctx.quiet {
        print_staged(&ctx.style, &state);
    }
    Ok(())
}

fn handle_unstage(ctx: &Context, index: usize) -> Result<(), DropError> {
    let (mut session, _poller) = open_session(ctx)?;
    let removed = session.staging_mut().unstage(index)?;
    let state = session.staging().state();
    state.save(&ctx.workspace)?;

    println!(
        "{}",
        ctx.style.message(
            MessageType::Ok,
            &format!(
                "Unstaged {} ({} left)",
                ctx.style.file_name(removed.name()),
                state.entries.len()
            )
        )
    );
    Ok(())
}

fn handle_commit(
    ctx: &Context,
    merge: bool,
    name: Option<String>,
    no_watch: bool,
    json: bool,
) -> Result<(), DropError> {
    let (mut session, poller) = open_session(ctx)?;
    let merge = merge || ctx.config.staging.merge_staged_files;

    if name.is_some() && !merge {
        // stderr keeps --json output parseable
        eprintln!(
            "{}",
            ctx.style
                .message(MessageType::Warn, "--name is ignored without --merge")
        );
    }
    {
        let staging = session.staging_mut();
        staging.set_merge_staged_files(merge);
        if let Some(name) = name {
            staging.set_merged_name(name);
        }
    }
    let merged_name = session.staging().merged_name().to_string();

    let count = session.commit_staged()?;
    // The staged sequence now belongs to the transport.
    session.staging().state().save(&ctx.workspace)?;

    if !json && !ctx.quiet {
        let what = format::plural(count, "entry");
        let text = if merge && !merged_name.is_empty() {
            format!("Submitted {} merged into {}", what, ctx.style.file_name(&merged_name))
        } else if merge {
            format!("Submitted {} merged into one document", what)
        } else {
            format!("Submitted {}", what)
        };
        println!("{}", ctx.style.message(MessageType::Ok, &text));
    }

    finish_submission(ctx, session, &poller, no_watch, json)
}

fn handle_replay(
    ctx: &Context,
    events_path: &Path,
    dismiss_completed: bool,
    phase: Option<FileStatusPhase>,
    show_hidden: bool,
    json: bool,
) -> Result<(), DropError> {
    let events = read_feed_events(events_path)?;
    let total_events = events.len();

    let mut aggregator = StatusAggregator::new(
        ctx.config.dashboard.max_visible,
        ctx.config.summary_messages(),
    );
    let applied = events
        .into_iter()
        .map(|event| aggregator.apply(event))
        .filter(|changed| *changed)
        .count();
    tracing::debug!("Applied {} of {} recorded events", applied, total_events);

    let dismissed = if dismiss_completed {
        aggregator.dismiss_completed()
    } else {
        0
    };

    if let Some(phase) = phase {
        let records: Vec<FileStatus> = aggregator
            .statuses_by_phase(Some(phase))
            .into_iter()
            .cloned()
            .collect();
        if json {
            return print_json(&records);
        }
        if records.is_empty() {
            println!(
                "{}",
                ctx.style
                    .message(MessageType::Info, &format!("No records in phase {}", phase))
            );
        } else {
            println!("{}", table::render_status_table(&records, &ctx.style));
        }
        return Ok(());
    }

    let snapshot = aggregator.snapshot();
    if json {
        return print_json(&snapshot);
    }
    if dismissed > 0 && !ctx.quiet {
        println!(
            "{}",
            ctx.style.message(
                MessageType::Info,
                &format!("Dismissed {}", format::plural(dismissed, "completed record"))
            )
        );
    }
    render_dashboard(&ctx.style, &snapshot, show_hidden);
    Ok(())
}

fn handle_config(ctx: &Context, action: ConfigAction) -> Result<(), DropError> {
    match action {
        ConfigAction::Show { json } => {
            let shown = ctx.config.redacted();
            if json {
                return print_json(&shown);
            }
            let source = match &ctx.config_path {
                Some(path) if path.exists() => path.display().to_string(),
                Some(path) => format!("{} (not found, using defaults)", path.display()),
                None => "defaults".to_string(),
            };
            println!("{}", ctx.style.message(MessageType::Info, "Effective configuration:"));
            println!("{}", ctx.style.message_detail("Source", &source));
            println!();
            print!("{}", shown.to_yaml()?);
            Ok(())
        }
        ConfigAction::Path => {
            match &ctx.config_path {
                Some(path) => println!("{}", path.display()),
                None => println!(
                    "{}",
                    ctx.style
                        .message(MessageType::Warn, "Could not determine home directory")
                ),
            }
            Ok(())
        }
    }
}

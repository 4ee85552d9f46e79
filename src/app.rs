//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, wires the
//! transport and the arbiter, and runs one coordinator operation per invocation.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use workflow_courier::cli::{Args, Command, clean_path};
use workflow_courier::config::{LoadResult, load_or_init};
use workflow_courier::conflict::{
    Arbiter, ConflictDecision, FixedPolicy, PlannedItem, PromptArbiter, SuffixRenamePolicy,
};
use workflow_courier::notify::report;
use workflow_courier::output::{self as out, ConsoleSink};
use workflow_courier::transport::{
    ConnectionAvailabilityCache, HttpChannel, StatelessChannel, TransportDispatcher,
    TransportProvider,
};
use workflow_courier::{
    Config, ConflictPolicy, CourierError, FileOperationCoordinator, HostProbe, OperationOutcome,
    default_config_path, shutdown,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub async fn run(args: Args) -> ExitCode {
    match run_inner(args).await {
        Ok(code) => code,
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            ExitCode::from(1)
        }
    }
}

fn print_config_location() {
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Config file:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run any command to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a config path: {e}")),
    }
}

async fn run_inner(args: Args) -> Result<ExitCode> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(ExitCode::SUCCESS);
    }

    let mut cfg = match load_or_init()? {
        LoadResult::Loaded(cfg, _) => cfg,
        LoadResult::CreatedTemplate(path) => {
            out::print_warn(&format!(
                "A template config was written to {}; built-in defaults are in effect.",
                path.display()
            ));
            Config::default()
        }
        LoadResult::Defaults => Config::default(),
    };
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    // Initialize logging and capture the guard so we can drop it on signal
    let guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .context("initialize logging")?;
    let guard_slot = Arc::new(Mutex::new(guard));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; finishing the current request...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .context("install signal handler")?;
    }

    let Some(command) = args.command.clone() else {
        out::print_error("no command given; see --help");
        return Ok(ExitCode::from(1));
    };
    debug!(?command, http_base = %cfg.http_base, "Starting workflow_courier");

    let coordinator = build_coordinator(&cfg).await?;
    let result = execute(&coordinator, command, args.json).await;

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

async fn build_coordinator(cfg: &Config) -> Result<FileOperationCoordinator> {
    let availability = Arc::new(ConnectionAvailabilityCache::new(cfg.availability_ttl));
    let fallback: Arc<dyn StatelessChannel> =
        Arc::new(HttpChannel::new(&cfg.http_base).context("build HTTP client")?);
    let primary = if cfg.use_websocket {
        TransportProvider::for_host(&cfg.http_base, cfg.ws_url.as_deref(), cfg.timeouts.default)
            .resolve_primary()
            .await
    } else {
        None
    };
    if primary.is_none() {
        debug!("no persistent channel; HTTP only");
    }

    let dispatcher = Arc::new(
        TransportDispatcher::with_channels(availability, primary, fallback)
            .with_primary_timeout(cfg.timeouts.default)
            .with_fallback_timeout(cfg.fallback_timeout),
    );
    let arbiter = build_arbiter(cfg.on_conflict, &dispatcher, cfg.timeouts.default);

    Ok(FileOperationCoordinator::new(dispatcher, arbiter, cfg.timeouts)
        .with_current_directory(cfg.current_directory.clone())
        .with_strict_documents(cfg.strict_documents))
}

fn build_arbiter(
    policy: ConflictPolicy,
    dispatcher: &Arc<TransportDispatcher>,
    probe_timeout: Duration,
) -> Arc<dyn Arbiter> {
    match policy {
        ConflictPolicy::Ask => Arc::new(PromptArbiter::stdin()),
        ConflictPolicy::Skip => Arc::new(FixedPolicy::new(ConflictDecision::Skip)),
        ConflictPolicy::Overwrite => Arc::new(FixedPolicy::new(ConflictDecision::Overwrite)),
        ConflictPolicy::Cancel => Arc::new(FixedPolicy::new(ConflictDecision::Cancel)),
        ConflictPolicy::RenameSuffix => Arc::new(SuffixRenamePolicy::new(HostProbe::new(
            Arc::clone(dispatcher),
            probe_timeout,
        ))),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    out::print_user(&serde_json::to_string_pretty(value).context("serialize result")?);
    Ok(())
}

fn finish_outcome(action: &str, outcome: &OperationOutcome, json: bool) -> Result<ExitCode> {
    if json {
        print_json(outcome)?;
    } else {
        report(&ConsoleSink, action, outcome);
    }
    let code = outcome.kind.map(|k| k.exit_code()).unwrap_or(if outcome.success { 0 } else { 1 });
    Ok(ExitCode::from(code))
}

fn fail(err: &CourierError, json: bool) -> Result<ExitCode> {
    if json {
        print_json(&OperationOutcome::from_error(err))?;
    } else {
        out::print_error(&err.to_string());
    }
    Ok(ExitCode::from(err.exit_code()))
}

fn read_plan(path: &std::path::Path) -> Result<Vec<PlannedItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read plan '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse plan '{}'", path.display()))
}

async fn execute(c: &FileOperationCoordinator, command: Command, json: bool) -> Result<ExitCode> {
    match command {
        Command::Ls { path } => match c.list_directory(&clean_path(&path)).await {
            Ok(listing) if json => print_json(&listing).map(|_| ExitCode::SUCCESS),
            Ok(listing) => {
                out::print_listing(&listing);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => fail(&e, json),
        },
        Command::Mkdir { parent, name } => {
            let outcome = c.create_directory(&clean_path(&parent), name.trim()).await;
            finish_outcome("mkdir", &outcome, json)
        }
        Command::Rmdir { path } => {
            let outcome = c.delete_directory(&clean_path(&path)).await;
            finish_outcome("rmdir", &outcome, json)
        }
        Command::Rm { path } => {
            let outcome = c.delete_file(&clean_path(&path)).await;
            finish_outcome("rm", &outcome, json)
        }
        Command::Rename { path, new_name } => {
            let outcome = c.rename(&clean_path(&path), new_name.trim()).await;
            finish_outcome("rename", &outcome, json)
        }
        Command::Mv {
            source,
            target,
            decision,
        } => {
            let outcome = c
                .move_file(&clean_path(&source), &clean_path(&target), decision.decision())
                .await;
            finish_outcome("mv", &outcome, json)
        }
        Command::MvDir {
            source,
            target,
            new_name,
            decision,
        } => {
            let outcome = c
                .move_directory(
                    &clean_path(&source),
                    &clean_path(&target),
                    new_name.as_deref(),
                    decision.decision(),
                )
                .await;
            finish_outcome("mv-dir", &outcome, json)
        }
        Command::Cp {
            source,
            target,
            new_name,
            decision,
        } => {
            let outcome = c
                .copy_file(
                    &clean_path(&source),
                    &clean_path(&target),
                    new_name.as_deref(),
                    decision.decision(),
                )
                .await;
            finish_outcome("cp", &outcome, json)
        }
        Command::CpDir {
            source,
            target,
            new_name,
            decision,
            plan,
        } => {
            let decision = match plan {
                Some(path) => Some(ConflictDecision::DetailedPlan {
                    items: read_plan(&path)?,
                }),
                None => decision.decision(),
            };
            let outcome = c
                .copy_directory(
                    &clean_path(&source),
                    &clean_path(&target),
                    new_name.as_deref(),
                    decision,
                )
                .await;
            finish_outcome("cp-dir", &outcome, json)
        }
        Command::Exists { path } => {
            let path = clean_path(&path);
            let exists = c.path_exists(&path).await;
            if json {
                print_json(&serde_json::json!({ "path": path, "exists": exists }))?;
            } else {
                out::print_user(if exists { "true" } else { "false" });
            }
            Ok(if exists { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Info { path } => {
            let path = clean_path(&path);
            let info = c.get_path_info(&path).await;
            if json {
                print_json(&info)?;
            } else {
                let kind = if info.is_directory {
                    "directory"
                } else if info.is_file {
                    "file"
                } else {
                    "-"
                };
                out::print_user(&format!("{path}: exists={} type={kind}", info.exists));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Load { path, output, .. } => {
            let doc = match c.load_document(&clean_path(&path)).await {
                Ok(doc) => doc,
                Err(e) => return fail(&e, json),
            };
            if json {
                print_json(&doc)?;
                return Ok(ExitCode::SUCCESS);
            }
            let text = serde_json::to_string_pretty(&doc.document).context("serialize document")?;
            match output {
                Some(file) => {
                    std::fs::write(&file, text)
                        .with_context(|| format!("write '{}'", file.display()))?;
                    out::print_success(&format!(
                        "{} node(s) written to {} ({} repair(s))",
                        doc.document.as_object().map(|m| m.len()).unwrap_or(0),
                        file.display(),
                        doc.repairs.len()
                    ));
                }
                None => out::print_user(&text),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Save { path, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read '{}'", file.display()))?;
            let document: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    return fail(
                        &CourierError::FormatMalformed(format!("{}: {e}", file.display())),
                        json,
                    );
                }
            };
            let outcome = c.save_document(&clean_path(&path), &document).await;
            finish_outcome("save", &outcome, json)
        }
        Command::Status => {
            let status = c.dispatcher().connection_status().await;
            if json {
                print_json(&status)?;
            } else {
                for s in &status.strategies {
                    let role = if s.primary { "primary" } else { "fallback" };
                    match &s.detail {
                        None => out::print_success(&format!("{} ({role}) reachable", s.name)),
                        Some(detail) => out::print_warn(&format!("{} ({role}): {detail}", s.name)),
                    }
                }
            }
            Ok(if status.any_reachable() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(4)
            })
        }
    }
}

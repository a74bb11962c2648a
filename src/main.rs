// Tue Jan 13 2026 - Alex

use anyhow::{anyhow, Context, Result};
use heap_inspector::{
    config::HeapConfig,
    replay::ReplayTarget,
    session::HeapSession,
    ui::{print_error, segment_rows, type_rows, CliInterface, Commands, DisplayRenderer, LiveReport, LocateReport},
    utils::{parse_address, LoggingUtils},
};
use serde::Serialize;
use std::sync::Arc;

fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn address_arg(text: &str) -> Result<heap_inspector::memory::Address> {
    parse_address(text).ok_or_else(|| anyhow!("'{}' is not a hex address", text))
}

fn load_config(args: &CliInterface) -> Result<HeapConfig> {
    let mut config = match &args.config {
        Some(path) => HeapConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HeapConfig::default(),
    };
    if args.no_cards {
        config.check_cards = false;
    }
    if let Commands::Verify { max_issues } = args.command {
        config.max_diagnostics = max_issues;
    }
    Ok(config)
}

/// Runs one command. `Ok(false)` means the command completed but found a
/// problem, such as heap corruption.
fn run(args: &CliInterface) -> Result<bool> {
    let config = load_config(args)?;
    let target = ReplayTarget::load(&args.image)
        .with_context(|| format!("Failed to load heap image {}", args.image.display()))?;
    log::info!(
        "Loaded {} ({}, {} bytes mapped)",
        args.image.display(),
        target.architecture(),
        target.mapped_bytes()
    );
    let session = HeapSession::from_target(Arc::new(target), config).context("Failed to open the GC heap")?;
    for failure in session.snapshot().failures() {
        log::warn!("Segment list incomplete: {}", failure);
    }

    let renderer = DisplayRenderer::new().with_color(!args.no_color);

    match &args.command {
        Commands::Heap => {
            let rows = segment_rows(&session);
            if args.json {
                emit_json(&rows)?;
            } else {
                let mode = if session.snapshot().is_server() { "Server" } else { "Workstation" };
                println!("{} GC, {} heap(s)", mode, session.snapshot().heaps().len());
                println!("{}", renderer.render_segments(&rows));
            }
        }
        Commands::Stat { top } => {
            let stat = session.aggregate_by_type()?;
            let rows = type_rows(&session, &stat, *top);
            if args.json {
                emit_json(&rows)?;
            } else {
                println!("{}", renderer.render_types(&rows, stat.total()));
            }
        }
        Commands::Strings { top } => {
            let stat = session.aggregate_strings()?;
            if args.json {
                let entries: Vec<_> = stat.iter().take(top.unwrap_or(usize::MAX)).collect();
                emit_json(&entries)?;
            } else {
                println!("{}", renderer.render_strings(&stat, *top));
            }
        }
        Commands::Verify { .. } => {
            let summary = session.verify()?;
            if args.json {
                emit_json(&summary)?;
            } else {
                print!("{}", renderer.render_verification(&summary));
            }
            return Ok(summary.is_clean());
        }
        Commands::Live { objects } => {
            let roots = session.roots()?;
            let live = session.reachability_from(&roots)?;
            let report = LiveReport::new(&roots, &live, *objects);
            if args.json {
                emit_json(&report)?;
            } else {
                print!("{}", renderer.render_live(&report));
            }
        }
        Commands::Locate { address } => {
            let address = address_arg(address)?;
            let report = LocateReport::new(&session, address, session.locate(address)?);
            if args.json {
                emit_json(&report)?;
            } else {
                print!("{}", renderer.render_location(&report));
            }
        }
        Commands::Gcroot { address } => {
            let address = address_arg(address)?;
            let path = session.root_path(address)?;
            if args.json {
                emit_json(&path)?;
            } else {
                print!("{}", renderer.render_root_path(&session, address, path.as_ref()));
            }
        }
        Commands::Usage { live } => {
            let live_set = if *live { Some(session.reachability()?) } else { None };
            let usage = session.heap_usage(live_set.as_ref())?;
            if args.json {
                emit_json(&usage)?;
            } else {
                println!("{}", renderer.render_usage(&usage));
            }
        }
        Commands::Finalizers { live } => {
            let live_set = if *live { Some(session.reachability()?) } else { None };
            let summary = session.finalizer_summary(live_set.as_ref())?;
            if args.json {
                emit_json(&summary)?;
            } else {
                print!("{}", renderer.render_finalizers(&session, &summary));
            }
        }
    }

    Ok(true)
}

fn main() {
    let args = CliInterface::parse_args();

    if args.no_color {
        colored::control::set_override(false);
    }
    LoggingUtils::init_logger(LoggingUtils::level_from_verbosity(args.verbose as usize), !args.no_color);

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{debug, warn};
use weave_core::weaver::{find_modules, WeaveSummary};
use weave_core::{
    init_tracing_with_level, AspectSpec, JsonTreeParser, ModuleWeaver, SearchPathRegistry,
    WeaveConfig, Worklist,
};

fn cli() -> Command {
    Command::new("weave")
        .version(weave_core::VERSION)
        .about("Weave aspect advices into module trees")
        .arg(
            Arg::new("spec")
                .long("spec")
                .value_name("FILE")
                .help("Aspect spec file (JSON)")
                .required(true),
        )
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Module tree file, or a directory of them")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("base")
                .long("base")
                .value_name("DIR")
                .help("Base directory for module local names (defaults to a directory TARGET)"),
        )
        .arg(
            Arg::new("include")
                .short('I')
                .value_name("PATH")
                .help("Extra root for resolving advice modules")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("DIR")
                .help("Output directory for woven modules")
                .default_value("woven"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file (JSON)"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Weave but do not write anything")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("display")
                .long("display")
                .help("Print the source of woven modules")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Log every pointcut test")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let debug_enabled = matches.get_flag("debug");
    init_tracing_with_level(if debug_enabled { "trace" } else { "info" });

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => WeaveConfig::from_file(path).with_context(|| format!("loading {path}"))?,
        None => WeaveConfig::default(),
    };
    if let Some(includes) = matches.get_many::<String>("include") {
        config.search_paths.extend(includes.map(PathBuf::from));
    }
    if let Some(base) = matches.get_one::<String>("base") {
        config.base_path = Some(PathBuf::from(base));
    }
    config.dry_run |= matches.get_flag("dry-run");
    config.display |= matches.get_flag("display");

    let spec_path = PathBuf::from(matches.get_one::<String>("spec").context("missing --spec")?);
    let target = PathBuf::from(matches.get_one::<String>("target").context("missing TARGET")?);
    let out_dir = matches
        .get_one::<String>("out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("woven"));

    let spec = AspectSpec::from_file(&spec_path)
        .with_context(|| format!("loading spec {}", spec_path.display()))?;
    let resolver = spec.resolver(&config.search_paths).with_current_dir();
    let worklist = spec.worklist(&resolver)?;
    debug!(advices = worklist.len(), "worklist loaded");

    let files = if target.is_dir() {
        if config.base_path.is_none() {
            config.base_path = Some(target.clone());
        }
        find_modules(&target, &config.tree_extension)?
    } else {
        vec![target]
    };

    let summary = weave_files(&files, &worklist, &config, &out_dir);

    println!(
        "{} modules processed, {} woven, {} advices applied",
        summary.modules_processed, summary.modules_woven, summary.advices_applied
    );
    if !summary.success() {
        for error in &summary.errors {
            eprintln!("{error}");
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Weave every file independently; one failing module does not stop the rest
fn weave_files(
    files: &[PathBuf],
    worklist: &Worklist,
    config: &WeaveConfig,
    out_dir: &Path,
) -> WeaveSummary {
    let registry = SearchPathRegistry::global();
    let mut parser = JsonTreeParser::new();
    let mut summary = WeaveSummary::new();

    for file in files {
        let mut weaver = ModuleWeaver::new(file, config.base_path.as_deref());
        let outcome = weaver
            .parse(&mut parser)
            .map(|_| ())
            .and_then(|()| weaver.weave(worklist, registry, config.max_mangle_attempts));
        summary.record(&weaver, &outcome);

        if !matches!(outcome, Ok(true)) {
            continue;
        }
        if config.display {
            match weaver.render() {
                Ok(source) => println!("# {}\n{source}", weaver.local_name()),
                Err(e) => warn!(module = weaver.local_name(), error = %e, "cannot render"),
            }
        }
        if !config.dry_run {
            match weaver.write_outputs(out_dir) {
                Ok((tree, _)) => debug!(path = %tree.display(), "wrote woven module"),
                Err(e) => summary
                    .errors
                    .push(format!("Error writing {}: {e:#}", weaver.local_name())),
            }
        }
    }
    summary
}

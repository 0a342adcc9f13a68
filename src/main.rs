//! gtml's main application entry point.
//! Handles command-line argument parsing, start-up configuration,
//! and drives the processing of every file named on the command line.

use gtml::{
    cli::{get_args, Args},
    config::{build_filter, configure},
    context::{Context, Options},
    deps::Makefile,
    error::{default_error_handler, Error, Result},
    eval::HostEvaluator,
    logger::init_logger,
    processor::{process_file, write_file},
};
use log::info;

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose, args.silent);

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => default_error_handler(err),
    }
}

/// Main application logic execution.
///
/// # Returns
/// * `Result<bool>` - Whether the run finished without reporting any error
///
/// # Flow
/// 1. Builds the context from the command line switches
/// 2. Imports the environment, rc projects and `-D` definitions
/// 3. Processes every file in command line order
/// 4. Writes the makefile when asked to
fn run(args: Args) -> Result<bool> {
    let root = std::env::current_dir().map_err(Error::IoError)?;
    let options = Options {
        fast: args.fast,
        makefile: args.makefile.is_some(),
        filter: build_filter(&args.only)?,
    };
    let mut ctx = Context::new(root).with_options(options);
    if args.allow_eval {
        ctx = ctx.with_evaluator(Box::new(HostEvaluator::new()));
    }

    configure(&mut ctx, &args.defines);

    for file in &args.files {
        if let Err(err) = process_file(&mut ctx, file) {
            ctx.diagnostics.error(&err);
        }
    }

    if let Some(makefile) = &args.makefile {
        let path = ctx.root.join(makefile);
        write_file(&path, &Makefile::new(&ctx.deps, "gtml").to_string())?;
        info!("Makefile written to '{}'", makefile.display());
    }

    info!(
        "Done with {} warning(s) and {} error(s)",
        ctx.diagnostics.warnings(),
        ctx.diagnostics.errors()
    );
    Ok(!ctx.diagnostics.failed())
}

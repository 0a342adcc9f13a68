//! Command-line interface implementation for gtml.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

use crate::constants::DEFAULT_MAKEFILE;

/// Command-line arguments structure for gtml.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "gtml: manage groups of HTML files with macros and a page hierarchy",
    long_about = None,
    after_help = "Before processing command line arguments, gtml processes the project files \
                  `$HOME/.gtmlrc', `$HOME/gtml.conf', `./.gtmlrc' and `./gtml.conf' in this order.\n\n\
                  Exit status is 1 if errors have been encountered, and 0 if all was OK."
)]
pub struct Args {
    /// Project files (.gtp) or source files to process
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,

    /// Do not produce output files but generate a makefile ready to create them.
    /// Without a file name the makefile is called `GNUmakefile'.
    #[arg(short = 'M', long, value_name = "FILE", num_args = 0..=1, default_missing_value = DEFAULT_MAKEFILE)]
    pub makefile: Option<PathBuf>,

    /// Define a macro before reading any project, as `MACRO` or `MACRO=DEFINITION`
    #[arg(short = 'D', long = "define", value_name = "MACRO[=DEFINITION]")]
    pub defines: Vec<String>,

    /// Only process the source files matching this pattern in project files
    #[arg(short = 'F', long = "file", value_name = "PATTERN")]
    pub only: Vec<String>,

    /// Skip source files whose output is not older than them
    #[arg(long)]
    pub fast: bool,

    /// Only report warnings and errors
    #[arg(long)]
    pub silent: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Allow content files to evaluate expressions and run commands
    /// through `__PYTHON__` and `__SYSTEM__`
    #[arg(long)]
    pub allow_eval: bool,
}

/// Splits a `-D` argument into its macro name and value.
pub fn parse_define(define: &str) -> (&str, &str) {
    define.split_once('=').unwrap_or((define, ""))
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if no file is given
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

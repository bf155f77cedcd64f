//! Command-line interface implementation for proyo.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for proyo.
#[derive(Parser, Debug)]
#[command(author, version, about = "proyo: hierarchical project scaffolding", long_about = None)]
pub struct Args {
    /// Path to the template directory
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// Directory where the generated project will be created
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Force overwrite of existing output directory
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Read template variables as a JSON object from stdin
    #[arg(short, long)]
    pub stdin: bool,

    /// Read template variables from a JSON or YAML file
    #[arg(long, value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// Define a template variable. The value is parsed as JSON and falls
    /// back to a plain string. May be repeated.
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    pub define: Vec<String>,

    /// Directory of macro files replacing template files with the same name
    #[arg(long, value_name = "DIR")]
    pub macros: Option<PathBuf>,

    /// Do not run the post-run chunks of control files.
    #[arg(long)]
    pub skip_post_run: bool,

    /// Skip the confirmation prompt before running post-run chunks.
    /// Post-run chunks may execute commands on your system.
    #[arg(long)]
    pub skip_post_run_check: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                // Printing help can only fail if stdout is gone; exit either way.
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

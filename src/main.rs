//! proyo's main application entry point and orchestration logic.
//! Handles command-line argument parsing and drives the phases of a
//! generation run.

use log::{debug, info};

use proyo::{
    cli::{get_args, Args},
    constants::PROJECT_FOLDER_VAR,
    error::{default_error_handler, Error, Result},
    ignore::parse_ignore_file,
    loader::{load_macros, load_template, Macros},
    parser::{get_variables, VariableSources},
    processor::{ensure_output_dir, write_files},
    prompt::{confirm_post_run, DialoguerPrompter},
    script::Value,
    tree::Tree,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Validates the output and template directories
/// 2. Loads macros, seeded variables and ignore patterns
/// 3. Parses the root node, then applies the seeded variables globally
/// 4. Runs the tree and writes the output collection
/// 5. Runs post-run chunks after confirmation
fn run(args: Args) -> Result<()> {
    let prompt = DialoguerPrompter::new();

    let output_root = ensure_output_dir(&args.output_dir, args.force)?;
    let template_root = load_template(&args.template)?;
    let macros = match &args.macros {
        Some(dir) => load_macros(dir)?,
        None => Macros::new(),
    };

    let mut variables = get_variables(&VariableSources {
        stdin: args.stdin,
        vars_file: args.vars_file.as_deref(),
        definitions: &args.define,
    })?;
    let project_folder = std::path::absolute(&output_root).unwrap_or(output_root.clone());
    variables.insert(
        PROJECT_FOLDER_VAR.to_string(),
        Value::Str(project_folder.to_string_lossy().into_owned()),
    );

    let ignored_patterns = parse_ignore_file(&template_root)?;
    let mut tree =
        Tree::new(&template_root, variables.clone(), macros).with_ignore(ignored_patterns);
    let root = tree.root();

    tree.parse(root);
    // Explicit values win over defaults set while parsing.
    tree.update_global(root, variables);
    tree.run(root);

    let post_run = tree.pending_post_run();
    let report = write_files(&output_root, tree.files())?;
    let listing = serde_json::to_string_pretty(&report.files).map_err(|e| Error::IoError(e.into()))?;
    println!("Generated to {}: {}", output_root.display(), listing);

    if args.skip_post_run {
        debug!("Skipping post-run chunks");
    } else if confirm_post_run(&prompt, &post_run, args.skip_post_run_check)? {
        info!("Running post-run chunks of {} control files", post_run.len());
        tree.post_run_all();
    }

    Ok(())
}

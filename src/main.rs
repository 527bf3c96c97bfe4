//! railgen's main application entry point.
//! Parses the command line, resolves the options and runs the generation
//! pipeline against the target directory.

use railgen::{
    catalog::{bundled, AssetCatalog, LocalCatalog},
    cli::{get_args, print_informational, Args},
    config::{load_options_file, merge},
    error::{default_error_handler, Result},
    logger::init_logger,
    options::{resolve, RawOptions},
    pipeline::{generate, Outcome},
    renderer::MiniJinjaRenderer,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Layers command-line values over the options file, if any
/// 2. Resolves the options against the schema
/// 3. Opens the asset catalog
/// 4. Runs the generation pipeline
fn run(args: Args) -> Result<()> {
    let file_options = match &args.options_file {
        Some(path) => load_options_file(path)?,
        None => RawOptions::new(),
    };
    let options = resolve(&merge(file_options, args.raw_options()))?;

    let local;
    let embedded;
    let catalog: &dyn AssetCatalog = match &args.templates {
        Some(dir) => {
            local = LocalCatalog::open(dir)?;
            &local
        }
        None => {
            embedded = bundled();
            &embedded
        }
    };
    let renderer = MiniJinjaRenderer::new();

    match generate(&args.app_path, &options, catalog, &renderer, args.quiet)? {
        Outcome::ShortCircuited => print_informational(&options),
        Outcome::Generated(report) => {
            log::debug!(
                "Ran {} steps, skipped {}",
                report.executed.len(),
                report.skipped.len()
            );
            if !args.quiet {
                println!("Application skeleton created in {}.", args.app_path.display());
            }
        }
    }
    Ok(())
}

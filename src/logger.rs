/// Sets up `env_logger` for the process. `RUST_LOG` still overrides the level.
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(level_filter(verbose))
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn level_filter(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Sets up env_logger: debug output when verbose, warnings and errors only
/// when silent, progress otherwise.
pub fn init_logger(verbose: bool, silent: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else if silent {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();
}

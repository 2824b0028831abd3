use log::LevelFilter;

/// Initialize logging for an embedding application (reads RUST_LOG).
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .try_init();
}

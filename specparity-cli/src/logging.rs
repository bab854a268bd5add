/// Log to stderr at `warn` unless `RUST_LOG` says otherwise; stdout carries the report.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
}

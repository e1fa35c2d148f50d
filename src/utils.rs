use ort::CPUExecutionProvider;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout only carries verdicts.
pub fn tracing_subscriber_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Must run before the first session is built.
pub fn ort_init() -> Result<(), ort::Error> {
    ort::init()
        .with_name("seefood")
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .commit()
}

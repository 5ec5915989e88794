use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize standard structured logging. Level comes from FACEFORGE_LOG
/// (e.g. "debug"), defaulting to INFO.
pub(crate) fn init_tracing() {
    let level = std::env::var("FACEFORGE_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok(); // Ignore err on re-init
}

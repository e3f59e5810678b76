use tracing_subscriber::{fmt, EnvFilter};

pub fn setup_tracing() {
    let subscriber = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    // Set the subscriber as the global default
    tracing::subscriber::set_global_default(subscriber).expect("tracing subscriber already set");
}

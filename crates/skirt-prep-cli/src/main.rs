mod cli;

use tracing_subscriber::EnvFilter;

fn main() {
    std::process::exit(cli::run_from_env());
}

/// Installs the stderr subscriber; `RUST_LOG` wins over `--verbose`.
pub(crate) fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

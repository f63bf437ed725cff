use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::version::build_info;

/// Install the stderr subscriber and the panic logger.
///
/// `level` is the configured default; `RUST_LOG` overrides it. Output goes to
/// stderr so command output on stdout can be piped.
pub fn init_logging(level: &str) {
    let default_level = parse_level(level);

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();

    register_panic_logger();
    report_build_info();
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or_else(|_| {
        eprintln!("Warning: unknown log level {:?}, using warn", level);
        LevelFilter::WARN
    })
}

/// Registers a panic hook that logs panics using the `tracing` crate
fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

fn report_build_info() {
    let build = build_info();

    tracing::debug!(
        build_profile = build.build_profile,
        version = build.repo_version,
        "envie starting up"
    );
}

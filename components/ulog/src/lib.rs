//! Logger set-up shared by the tests of every crate.
//!
//! Libraries of this workspace only depend on the `log` facade; binaries and tests pick the
//! backend.

#[cfg(feature = "env")]
use std::io::Write;

/// Default filter if `RUST_LOG` is not set.
#[cfg(feature = "env")]
const DEFAULT_FILTER: &str = "trace";

/// Initialize an `env_logger` backend writing to the test harness output.
///
/// Safe to call from every test: only the first call takes effect.
#[cfg(feature = "env")]
pub fn try_init_log() {
    try_init_log_with(DEFAULT_FILTER);
}

/// Same as [`try_init_log`] with `filter` as the default directive, e.g. `partition=debug`.
#[cfg(feature = "env")]
pub fn try_init_log_with(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .is_test(true)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}:{}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or_else(|| record.target()),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();
}

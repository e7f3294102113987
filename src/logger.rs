use chrono::Local;
use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Installs the process logger. `RUST_LOG` overrides the `info` default;
/// browser and websocket internals are held at `warn` unless asked for.
pub fn init() {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .filter(Some("headless_chrome"), LevelFilter::Warn)
        .filter(Some("tungstenite"), LevelFilter::Warn)
        .parse_env(Env::default());

    if builder.try_init().is_err() {
        return;
    }

    log::info!("Logger initialized.");
}

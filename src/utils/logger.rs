use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 開啟錯誤日誌檔（附加模式）。建立失敗時整個執行視為失敗。
pub fn open_error_log<P: AsRef<Path>>(path: P) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pigeon=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pigeon=info"))
    }
}

/// Console output on stderr plus a timestamped, append-only error log for
/// WARN and above.
pub fn init_cli_logger(verbose: bool, error_log: File) {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter(verbose));

    let error_file = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(error_log))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y/%m/%d %H:%M:%S".to_string()))
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(console)
        .with(error_file)
        .init();
}

/// JSON lines on stderr, for runs whose output is collected by a log shipper.
pub fn init_json_logger(verbose: bool, error_log: File) {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .with_filter(env_filter(verbose));

    let error_file = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(error_log))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y/%m/%d %H:%M:%S".to_string()))
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(console)
        .with(error_file)
        .init();
}

use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "study-hub";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV: &str = "STUDYHUB_LOG";

const DEFAULT_SPEC: &str = "warn,study_hub_lib=info,study_hub=info";

/// Logs sit next to the data files (tasks.json, progress.json, backups/).
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// `STUDYHUB_LOG`, then `RUST_LOG`, then the crate default. Blank values are skipped.
pub fn log_spec(lookup: impl Fn(&str) -> Option<String>) -> String {
    [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_SPEC.to_string())
}

#[cfg(feature = "app")]
fn log_file_spec(data_dir: &Path) -> flexi_logger::FileSpec {
    flexi_logger::FileSpec::default()
        .directory(log_directory(data_dir))
        .basename(LOG_FILE_BASENAME)
        .suffix(LOG_FILE_SUFFIX)
}

/// Level echoed to stderr; stdout is reserved for command output.
#[cfg(feature = "app")]
fn stderr_level() -> flexi_logger::Duplicate {
    if cfg!(debug_assertions) {
        flexi_logger::Duplicate::Info
    } else {
        flexi_logger::Duplicate::Warn
    }
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{detailed_format, Cleanup, Criterion, Logger, Naming, WriteMode};

    std::fs::create_dir_all(data_dir)?;
    let spec = log_spec(|key| std::env::var(key).ok());

    Logger::try_with_str(&spec)?
        .log_to_file(log_file_spec(data_dir))
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(stderr_level())
        .start()?;

    std::panic::set_hook(panic_logger(std::panic::take_hook()));

    log::info!(
        "study-hub {} logging to {} spec={spec}",
        env!("CARGO_PKG_VERSION"),
        log_directory(data_dir).display()
    );
    Ok(())
}

#[cfg(all(feature = "app", not(test)))]
type PanicHook = Box<dyn Fn(&std::panic::PanicHookInfo<'_>) + Send + Sync + 'static>;

/// Wraps `next` so the panic reaches the log file before the usual report.
#[cfg(all(feature = "app", not(test)))]
fn panic_logger(next: PanicHook) -> PanicHook {
    Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!(
            "panic at {location}: {}\n{}",
            panic_payload(info.payload()),
            std::backtrace::Backtrace::force_capture()
        );
        next(info);
    })
}

#[cfg(any(test, feature = "app"))]
fn panic_payload(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

use std::fmt::Write as FmtWrite;

use anyhow::Result;
use flexi_logger::{DeferredNow, Logger, LoggerHandle, Record};
use textwrap::{termwidth, Options};

/// Setup console logging for this application.
///
/// The returned handle flushes the logger when it is dropped, so keep it
/// alive for the duration of main.
pub fn setup() -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str("info")?
        .format(multiline_format)
        .start()?;

    log::info!(
        "Adjust the log level by setting RUST_LOG. By default RUST_LOG=info"
    );

    Ok(handle)
}

/// An opinionated formatting function for flexi_logger which automatically
/// wraps content to the terminal width.
pub fn multiline_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let full_line = format_record(
        &now.now().format("%H:%M:%S%.6f").to_string(),
        record,
    )
    .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    let size = termwidth().min(74);
    let wrap_options = Options::new(size)
        .initial_indent("┏ ")
        .subsequent_indent("┃ ");
    writeln!(w, "{}", textwrap::fill(&full_line, wrap_options))
}

fn format_record(
    timestamp: &str,
    record: &Record,
) -> Result<String, std::fmt::Error> {
    let mut full_line = String::new();
    writeln!(
        full_line,
        "{} [{}] [{}:{}]",
        record.level(),
        timestamp,
        record.file().unwrap_or("<unnamed>"),
        record.line().unwrap_or(0),
    )?;
    write!(&mut full_line, "{}", &record.args())?;
    Ok(full_line)
}

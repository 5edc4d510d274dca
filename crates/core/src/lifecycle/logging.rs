//! Logging initialization with optional file-based daily rotation.

use crate::mdc;
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Initialize the tracing subscriber.
///
/// - `to_file=true` → daily rotating file appender with non-blocking writer
/// - `to_file=false` → stderr output (default)
///
/// Every line is prefixed with the current diagnostic context (see [`MdcFormat`]).
/// Returns an `Option<WorkerGuard>` that **must be held** for the lifetime of
/// the application to ensure buffered logs are flushed on shutdown.
pub fn init_logging(level: &str, to_file: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if to_file {
        let dir = log_dir.unwrap_or("./logs");
        let file_appender = tracing_appender::rolling::daily(dir, "loggate.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_ansi(false)
            .event_format(MdcFormat::full())
            .init();

        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .event_format(MdcFormat::full())
            .init();

        None
    }
}

/// Event formatter that writes the diagnostic context as `[key=value ...]`
/// ahead of the wrapped formatter's output. Keys without a value render as `-`.
#[derive(Debug)]
pub struct MdcFormat<E = format::Format> {
    inner: E,
}

impl MdcFormat<format::Format> {
    /// Context prefix followed by the default full-format line.
    pub fn full() -> Self {
        Self::new(format::Format::default())
    }
}

impl Default for MdcFormat<format::Format> {
    fn default() -> Self {
        Self::full()
    }
}

impl<E> MdcFormat<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<S, N, E> FormatEvent<S, N> for MdcFormat<E>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    E: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write_mdc(&mut writer)?;
        self.inner.format_event(ctx, writer, event)
    }
}

/// Write the current diagnostic context. Writes nothing when it is empty.
pub fn write_mdc(w: &mut impl fmt::Write) -> fmt::Result {
    let entries = mdc::snapshot();
    if entries.is_empty() {
        return Ok(());
    }
    w.write_char('[')?;
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            w.write_char(' ')?;
        }
        write!(w, "{key}={}", value.as_deref().unwrap_or("-"))?;
    }
    w.write_str("] ")
}

/// In-memory log sink for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
impl Captured {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mdc_empty() {
        mdc::clear();
        let mut out = String::new();
        write_mdc(&mut out).unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_write_mdc_renders_sorted_entries() {
        mdc::scope(async {
            mdc::put("username", None);
            mdc::put("ip", Some("10.0.0.5".into()));
            let mut out = String::new();
            write_mdc(&mut out).unwrap();
            assert_eq!(out, "[ip=10.0.0.5 username=-] ");
        })
        .await;
    }

    #[tokio::test]
    async fn test_formatter_prefixes_log_lines() {
        mdc::clear();
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .event_format(MdcFormat::full())
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        mdc::scope(async {
            mdc::put("username", Some("alice".into()));
            tracing::info!("handling request");
        })
        .await;
        tracing::info!("outside request");

        let output = captured.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[username=alice] "), "{}", lines[0]);
        assert!(lines[0].contains("handling request"));
        assert!(!lines[1].contains("username="), "{}", lines[1]);
    }
}

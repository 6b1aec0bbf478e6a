use std::io;

use indicatif::MultiProgress;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;
use crate::error::{Error, Result};

/// Installs the fmt subscriber. `RUST_LOG` still applies, with this crate and
/// the calling binary raised or lowered to `level`.
///
/// Log lines and progress bars share stderr. The returned `MultiProgress`
/// must own every bar the binary draws so that each line is printed with the
/// bars cleared.
pub fn init(level: LogLevel, bin_target: &str) -> Result<MultiProgress> {
    let directive = |spec: String| {
        spec.parse::<Directive>()
            .map_err(|e| Error::Config(format!("Invalid log directive {}: {}", spec, e)))
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(directive(format!("prmigrate={}", level.as_directive()))?)
        .add_directive(directive(format!("{}={}", bin_target, level.as_directive()))?)
        .add_directive(directive("reqwest=warn".to_string())?)
        .add_directive(directive("hyper=warn".to_string())?);

    let progress = MultiProgress::new();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressWriter::new(progress.clone(), io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install logger: {}", e)))?;

    Ok(progress)
}

/// `MakeWriter` that suspends the given progress bars while a log line is
/// written.
#[derive(Clone)]
pub struct ProgressWriter<M> {
    progress: MultiProgress,
    inner: M,
}

impl<M> ProgressWriter<M> {
    pub fn new(progress: MultiProgress, inner: M) -> Self {
        Self { progress, inner }
    }
}

impl<'a, M> MakeWriter<'a> for ProgressWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SuspendedWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedWriter {
            progress: self.progress.clone(),
            inner: self.inner.make_writer(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted event and hands it to the inner writer in a single
/// suspended write when flushed or dropped.
pub struct SuspendedWriter<W: io::Write> {
    progress: MultiProgress,
    inner: W,
    buf: Vec<u8>,
}

impl<W: io::Write> io::Write for SuspendedWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let buf = std::mem::take(&mut self.buf);
        let inner = &mut self.inner;
        self.progress.suspend(|| {
            inner.write_all(&buf)?;
            inner.flush()
        })
    }
}

impl<W: io::Write> Drop for SuspendedWriter<W> {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use indicatif::{ProgressBar, ProgressDrawTarget};

    #[test]
    fn test_log_lines_survive_active_progress_bar() {
        let logs = CapturedLogs::default();
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let subscriber = tracing_subscriber::fmt()
            .with_writer(ProgressWriter::new(progress.clone(), logs.clone()))
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let pb = progress.add(ProgressBar::new(2));
            tracing::info!("Checking PR number: {}", 1);
            pb.inc(1);
            tracing::info!("Checking PR number: {}", 2);
            pb.inc(1);
            pb.finish();
        });

        let contents = logs.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Checking PR number: 1"));
        assert!(lines[1].ends_with("Checking PR number: 2"));
    }

    #[test]
    fn test_empty_writer_flush_is_a_no_op() {
        let logs = CapturedLogs::default();
        let writer = ProgressWriter::new(MultiProgress::new(), logs.clone());
        drop(writer.make_writer());
        assert!(logs.contents().is_empty());
    }
}

//! linesieve - Main Entry Point
//!
//! Buffers standard input through the pipeline and prints one page of it.
//!
//! Usage: `linesieve [CONFIG] [PAGE]`

use anyhow::Context;
use linesieve::{
    config::AppConfig, Buffer, CancelSignal, FilteredBuffer, Hub, Pipeliner, RawLineBuffer,
    Source,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Hub that only logs; there is no interactive UI in this binary.
struct LogHub;

impl Hub for LogHub {
    fn exec_query(&self) -> bool {
        false
    }

    fn send_draw(&self) {
        tracing::trace!("redraw requested");
    }
}

fn init_logging(config: &AppConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    match &config.logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .context("logging.file has no file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let page: usize = match args.next() {
        Some(p) => p.parse().with_context(|| format!("invalid page number {:?}", p))?,
        None => 1,
    };

    let (config, config_err) = match &config_path {
        Some(path) => (
            AppConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
            None,
        ),
        None => AppConfig::load_deferred(None),
    };
    let _guard = init_logging(&config)?;
    if let Some(e) = config_err {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    tracing::info!("Starting linesieve");

    let source = Source::with_config(
        std::io::stdin(),
        &config.source,
        config.buffer.channel_capacity,
    );
    let raw = Arc::new(RawLineBuffer::from_config(&config.buffer));

    // Blocks until the input is exhausted.
    source.setup(Some(&LogHub));

    let cancel = CancelSignal::new();
    let streamer = source.start(&cancel)?;
    let forwarder = raw.accept(&source);

    // Nothing consumes the raw buffer's stream in this binary; drain it.
    let forwarded = raw.output().iter().count();
    forwarder
        .join()
        .map_err(|_| anyhow::anyhow!("forwarder thread panicked"))?;
    streamer
        .join()
        .map_err(|_| anyhow::anyhow!("source thread panicked"))?;

    let view = FilteredBuffer::page(raw.clone(), page, config.buffer.page_size);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for i in 0..view.size() {
        writeln!(out, "{}", view.line_at(i)?.output())?;
    }

    tracing::info!(
        "Buffered {} of {} lines, printed page {} ({} lines)",
        raw.size(),
        forwarded,
        page,
        view.size()
    );
    Ok(())
}

use chrono::{Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::AppError;

const DEFAULT_FILTER: &str = "info,auto_reactor=debug";

/// Log file named after the current local date, reopened when the date changes.
#[derive(Debug)]
pub struct DailyLog {
    dir: PathBuf,
    current: Mutex<Option<(NaiveDate, File)>>,
}

impl DailyLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Mutex::new(None),
        }
    }

    pub fn file_name(date: NaiveDate) -> String {
        format!("{}-discord.log", date.format("%d-%m-%Y"))
    }

    fn write_on(&self, date: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;

        let stale = current.as_ref().map_or(true, |(opened, _)| *opened != date);
        if stale {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(Self::file_name(date)))?;
            *current = Some((date, file));
        }

        match current.as_mut() {
            Some((_, file)) => file.write(buf),
            None => Ok(0),
        }
    }

    fn flush_current(&self) -> io::Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        match current.as_mut() {
            Some((_, file)) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Writer handed out to the file layer for each event.
pub struct DailyLogWriter(Arc<DailyLog>);

impl Write for DailyLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_on(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush_current()
    }
}

/// Installs the console sink and the dated file sink.
///
/// The console filter can be overridden through `RUST_LOG`; the file keeps
/// everything at the default level, serenity's own gateway and http events
/// included.
pub fn init(dir: impl Into<PathBuf>) -> Result<(), AppError> {
    let daily = Arc::new(DailyLog::new(dir));

    let console = fmt::layer()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)));

    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(move || DailyLogWriter(Arc::clone(&daily)))
        .with_filter(EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}

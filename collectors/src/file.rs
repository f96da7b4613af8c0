use crate::format::{EventFormatter, HumanFormatter};
use herald::{Collect, Event, Result};
use parking_lot::Mutex;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Appends formatted events to a file.
///
/// The file is created on the first delivery (0600, create + append) rather
/// than at construction, so a collector can be built before its log
/// directory exists.  A failed write discards the handle and returns the
/// error; the retry machinery then reopens the path on the next attempt.
/// Rotation is out of scope, but [`FileCollector::reopen_missing`]
/// cooperates with external rotators that move the file away.
pub struct FileCollector {
  path: PathBuf,
  formatter: Box<dyn EventFormatter>,
  file: Arc<Mutex<Option<File>>>,
}

impl FileCollector {
  pub fn new(path: impl Into<PathBuf>) -> FileCollector {
    FileCollector {
      path: path.into(),
      formatter: Box::new(HumanFormatter::new()),
      file: Arc::new(Mutex::new(None)),
    }
  }

  pub fn formatter(mut self, formatter: impl EventFormatter) -> FileCollector {
    self.formatter = Box::new(formatter);
    self
  }

  /// Checks every `interval` whether the path still exists and, when it has
  /// vanished, discards the open handle so the next delivery recreates the
  /// file.  The watcher thread exits once the collector is dropped.
  pub fn reopen_missing(self, interval: Duration) -> FileCollector {
    let path = self.path.clone();
    let handle = Arc::downgrade(&self.file);
    thread::spawn(move || watch_removal(path, interval, handle));
    self
  }

  fn open(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      options.mode(0o600);
    }
    Ok(options.open(path)?)
  }
}

fn watch_removal(path: PathBuf, interval: Duration, handle: Weak<Mutex<Option<File>>>) {
  loop {
    thread::sleep(interval);
    let file = match handle.upgrade() {
      Some(file) => file,
      None => return,
    };
    if !path.exists() {
      file.lock().take();
    }
  }
}

impl fmt::Display for FileCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "File(path={})", self.path.display())
  }
}

impl Collect for FileCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    let bytes = self.formatter.format_event(event)?;
    let mut slot = self.file.lock();
    let mut file = match slot.take() {
      Some(file) => file,
      None => Self::open(&self.path)?,
    };
    match file.write_all(&bytes) {
      Ok(()) => {
        *slot = Some(file);
        Ok(())
      }
      Err(err) => Err(err.into()),
    }
  }

  fn close(&self) -> Result<()> {
    if let Some(file) = self.file.lock().take() {
      file.sync_all()?;
    }
    Ok(())
  }
}

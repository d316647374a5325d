//! Advisory file locks serializing bundle population across processes.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
}

#[derive(Debug, Error)]
pub enum CacheLockError {
  #[error("cache lock {lock_path} is held by {command} (PID {pid})", lock_path = lock_path.display())]
  Contention {
    command: String,
    pid: u32,
    lock_path: PathBuf,
  },

  #[error("cache lock {} is held by another process", lock_path.display())]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// Exclusive lock on a single lock file, released on drop.
#[derive(Debug)]
pub struct CacheLock {
  file: File,
  lock_path: PathBuf,
}

impl CacheLock {
  /// Try to take the lock without waiting.
  pub fn try_acquire(lock_path: &Path, command: &str) -> Result<Self, CacheLockError> {
    if let Some(dir) = lock_path.parent() {
      std::fs::create_dir_all(dir).map_err(CacheLockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(lock_path)
      .map_err(CacheLockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(lock_path));
      }
      return Err(CacheLockError::LockFailed(err));
    }

    Self::write_metadata(&file, command)?;

    Ok(CacheLock {
      file,
      lock_path: lock_path.to_path_buf(),
    })
  }

  /// Take the lock, polling until the current holder releases it.
  pub async fn acquire(lock_path: &Path, command: &str) -> Result<Self, CacheLockError> {
    let mut announced = false;
    loop {
      match Self::try_acquire(lock_path, command) {
        Err(err @ (CacheLockError::Contention { .. } | CacheLockError::ContentionUnknown { .. })) => {
          if !announced {
            info!("{}, waiting", err);
            announced = true;
          }
          tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
        other => return other,
      }
    }
  }

  /// Reads the lock metadata from the held file handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, command: &str) -> Result<(), CacheLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      command: command.to_string(),
    };

    file.set_len(0).map_err(CacheLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer(&mut writer, &metadata).map_err(|e| CacheLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(CacheLockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> CacheLockError {
    let metadata = std::fs::read_to_string(lock_path)
      .ok()
      .and_then(|contents| serde_json::from_str::<LockMetadata>(&contents).ok());

    match metadata {
      Some(metadata) => CacheLockError::Contention {
        command: metadata.command,
        pid: metadata.pid,
        lock_path: lock_path.to_path_buf(),
      },
      None => CacheLockError::ContentionUnknown {
        lock_path: lock_path.to_path_buf(),
      },
    }
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}

//! Durable sync of WAL files and their directory
//!
//! `durable_sync` maps to the strongest data-sync primitive each platform
//! offers. `sync_directory` persists directory entries, so a freshly
//! created or rotated WAL file is still found after a crash.

use std::fs::File;
use std::io;
use std::path::Path;

/// Block until the file's data reaches persistent storage.
///
/// - Linux: fdatasync()
/// - macOS/iOS: fcntl(F_FULLFSYNC), since plain fsync only reaches the drive cache
/// - Windows: FlushFileBuffers()
/// - Other: File::sync_data()
///
/// May block for a long time under heavy I/O; callers must not hold locks
/// that readers need.
pub fn durable_sync(file: &File) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the fd comes from a live File, so it is open for the call.
        let result = unsafe { libc::fdatasync(file.as_raw_fd()) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the fd comes from a live File, so it is open for the call.
        let result = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::fileapi::FlushFileBuffers;
        // SAFETY: the handle comes from a live File.
        let result = unsafe { FlushFileBuffers(file.as_raw_handle() as *mut _) };
        if result != 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios", target_os = "windows")))]
    {
        file.sync_data()
    }
}

/// Persist the directory entries of `dir`.
///
/// A no-op on Windows, where directories cannot be opened for syncing.
pub fn sync_directory(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()
    }

    #[cfg(not(unix))]
    {
        let _ = dir;
        Ok(())
    }
}

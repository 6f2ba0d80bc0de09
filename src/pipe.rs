//! The control pipe: a FIFO on disk that commands are written into.
//!
//! The FIFO is created on first use and reused on every later run; it is
//! never removed or truncated. A path that already exists but is not a FIFO
//! is refused rather than read from.

use crate::error::{Error, Result};
use crate::listener::Resume;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc::mode_t;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};

/// Whether [`acquire`] made the FIFO or found it already in place.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    Created,
    Reused,
}

/// An open, blocking read handle on the control FIFO.
///
/// Reads return end-of-data whenever no writer is connected. Call
/// [`Resume::resume`] then to wait for the next one.
#[derive(Debug)]
pub struct ControlPipe {
    path: PathBuf,
    origin: Origin,
    reader: File,
}

impl ControlPipe {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn origin(&self) -> Origin {
        self.origin
    }
}

impl Read for ControlPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Resume for ControlPipe {
    /// Blocks until a new writer has sent data or hung up.
    ///
    /// Once a writer has disconnected, the old handle reports hang-up forever,
    /// so the FIFO is opened again and the old handle is dropped. A handle
    /// opened after the last writer left only wakes up for data or for a
    /// writer that comes and goes. Bytes already sitting in the FIFO are
    /// readable from the new handle too.
    fn resume(&mut self) -> io::Result<()> {
        let reader = open_reader(&self.path)?;
        if !reader.metadata()?.file_type().is_fifo() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{:?} is no longer a pipe", self.path),
            ));
        }
        self.reader = reader;

        let mut fds = [PollFd::new(self.reader.as_fd(), PollFlags::POLLIN)];
        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }
}

/// Ensures a FIFO exists at `path` and opens it for reading.
///
/// `mode` is only used when the FIFO has to be created (the umask still
/// applies). Fails with [`Error::ChannelType`] if `path` exists and is not a
/// FIFO, and with [`Error::ChannelAccess`] for any other failure.
pub fn acquire(path: &Path, mode: u32) -> Result<ControlPipe> {
    let access = |err: io::Error| Error::ChannelAccess(path.to_path_buf(), err);

    #[allow(clippy::cast_possible_truncation, clippy::unnecessary_cast)]
    let origin = match mkfifo(path, Mode::from_bits_truncate(mode as mode_t)) {
        Ok(()) => Origin::Created,
        Err(Errno::EEXIST) => Origin::Reused,
        Err(errno) => return Err(access(errno.into())),
    };
    debug!("Control pipe {:?}: {:?}", path, origin);

    let reader = open_reader(path).map_err(access)?;
    if origin == Origin::Reused && !reader.metadata().map_err(access)?.file_type().is_fifo() {
        return Err(Error::ChannelType(path.to_path_buf()));
    }

    Ok(ControlPipe {
        path: path.to_path_buf(),
        origin,
        reader,
    })
}

// A plain open() on a FIFO waits for a writer to show up.
fn open_reader(path: &Path) -> io::Result<File> {
    let reader = OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)?;
    set_blocking(&reader)?;
    Ok(reader)
}

fn set_blocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags & !OFlag::O_NONBLOCK))?;
    Ok(())
}

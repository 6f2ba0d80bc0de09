use std::{error::Error as StdError, fmt, io, path::PathBuf};

pub type Result<T> = ::std::result::Result<T, Error>;

pub enum Error {
    ChannelType(PathBuf),
    ChannelAccess(PathBuf, io::Error),
    Spawn(String, io::Error),
    Signal(io::Error),
    Io(io::Error),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::ChannelType(_) => None,
            Self::ChannelAccess(_, err)
            | Self::Spawn(_, err)
            | Self::Signal(err)
            | Self::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} error: {}",
            match self {
                Self::ChannelType(_) | Self::ChannelAccess(_, _) => "Control pipe",
                Self::Spawn(_, _) => "Spawn",
                Self::Signal(_) => "Signal",
                Self::Io(_) => "I/O",
            },
            match self {
                Self::ChannelType(path) => {
                    format!("'{}' exists and is not a pipe", path.display())
                }
                Self::ChannelAccess(path, err) => {
                    format!("couldn't create or open '{}':\n{}", path.display(), err)
                }
                Self::Spawn(program, err) => format!("couldn't start '{}':\n{}", program, err),
                Self::Signal(err) | Self::Io(err) => format!("{}", err),
            }
        )
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

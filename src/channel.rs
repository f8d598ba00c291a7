//! A unidirectional byte conduit between a parent and a forked child.
//!
//! Usage after `fork`:
//!
//! ```text
//! child:  channel.register(Direction::Read)?;   // closes the write end
//! parent: channel.register(Direction::Write)?;  // closes the read end
//! ```
//!
//! Two channels are needed for a bidirectional connection.

use crate::error::{ChannelError, ShellError};
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};

/// Which end of the channel the current process uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// This process reads from the channel.
    Read,
    /// This process writes to the channel.
    Write,
}

/// An owned pipe.
///
/// Each end is held as an `Option<File>`; taking it out and dropping it closes
/// the descriptor, so an end can be closed at most once. Whatever is still
/// open is closed when the channel is dropped.
#[derive(Debug)]
pub struct Channel {
    read: Option<File>,
    write: Option<File>,
    direction: Option<Direction>,
}

impl Channel {
    /// Opens a new pipe.
    pub fn open() -> Result<Self, ShellError> {
        let (read, write) = nix::unistd::pipe().map_err(ShellError::os("pipe"))?;
        Ok(Self {
            read: Some(File::from(read)),
            write: Some(File::from(write)),
            direction: None,
        })
    }

    /// Commits this process to one direction and closes the other end.
    ///
    /// Must be called exactly once per process.
    pub fn register(&mut self, direction: Direction) -> Result<(), ChannelError> {
        if self.direction.is_some() {
            return Err(ChannelError::DirectionAlreadySet);
        }
        self.direction = Some(direction);
        match direction {
            Direction::Read => drop(self.write.take()),
            Direction::Write => drop(self.read.take()),
        }
        Ok(())
    }

    pub fn read_end(&mut self) -> Result<&mut File, ChannelError> {
        if self.direction != Some(Direction::Read) {
            return Err(ChannelError::WrongDirection("read"));
        }
        self.read.as_mut().ok_or(ChannelError::AlreadyClosed("read"))
    }

    pub fn write_end(&mut self) -> Result<&mut File, ChannelError> {
        if self.direction != Some(Direction::Write) {
            return Err(ChannelError::WrongDirection("write"));
        }
        self.write.as_mut().ok_or(ChannelError::AlreadyClosed("write"))
    }

    pub fn read_fd(&mut self) -> Result<RawFd, ChannelError> {
        self.read_end().map(|f| f.as_raw_fd())
    }

    pub fn write_fd(&mut self) -> Result<RawFd, ChannelError> {
        self.write_end().map(|f| f.as_raw_fd())
    }

    /// Closes the write end; the reader then sees end-of-stream.
    pub fn close_write_end(&mut self) -> Result<(), ChannelError> {
        if self.direction != Some(Direction::Write) {
            return Err(ChannelError::WrongDirection("write"));
        }
        let end = self.write.take().ok_or(ChannelError::AlreadyClosed("write"))?;
        drop(end);
        Ok(())
    }

    /// Splits one pipe into a registered reader and writer, both owned by
    /// this process.
    #[cfg(test)]
    pub(crate) fn split(mut self) -> (Channel, Channel) {
        let reader = Channel {
            read: self.read.take(),
            write: None,
            direction: Some(Direction::Read),
        };
        let writer = Channel {
            read: None,
            write: self.write.take(),
            direction: Some(Direction::Write),
        };
        (reader, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn register_closes_the_other_end() {
        let mut ch = Channel::open().unwrap();
        ch.register(Direction::Write).unwrap();
        assert_eq!(ch.read_end().unwrap_err(), ChannelError::WrongDirection("read"));
        assert!(ch.write_end().is_ok());
    }

    #[test]
    fn direction_is_registered_once() {
        let mut ch = Channel::open().unwrap();
        ch.register(Direction::Read).unwrap();
        assert_eq!(
            ch.register(Direction::Write),
            Err(ChannelError::DirectionAlreadySet)
        );
    }

    #[test]
    fn unregistered_channel_refuses_access() {
        let mut ch = Channel::open().unwrap();
        assert!(ch.read_end().is_err());
        assert!(ch.write_end().is_err());
        assert!(ch.close_write_end().is_err());
    }

    #[test]
    fn double_close_is_an_error() {
        let mut ch = Channel::open().unwrap();
        ch.register(Direction::Write).unwrap();
        ch.close_write_end().unwrap();
        assert_eq!(ch.close_write_end(), Err(ChannelError::AlreadyClosed("write")));
        assert_eq!(ch.write_end().unwrap_err(), ChannelError::AlreadyClosed("write"));
    }

    #[test]
    fn closing_write_end_signals_eof() {
        let (mut reader, mut writer) = Channel::open().unwrap().split();

        writer.write_end().unwrap().write_all(b"payload").unwrap();
        writer.close_write_end().unwrap();

        let mut got = Vec::new();
        reader.read_end().unwrap().read_to_end(&mut got).unwrap();
        assert_eq!(got, b"payload");
    }
}

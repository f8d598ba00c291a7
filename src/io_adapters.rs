use crate::channel::Channel;
use crate::error::ShellError;
use nix::libc::STDIN_FILENO;
use std::io::{self, Read};

/// Where a command's standard input comes from.
///
/// The first command of an interactive pipeline reads the shell's own
/// terminal input. A forked child already shares that descriptor, so nothing
/// is copied and the child sees end-of-file only when the terminal does. Every
/// later command reads the buffered output of the previous one, which has to
/// be pushed through a channel.
pub enum InputSource<'a> {
    /// The shell's inherited standard input.
    Inherited,
    /// An in-memory stream produced upstream.
    Buffered(Box<dyn Read + Send + 'a>),
}

impl<'a> InputSource<'a> {
    pub fn buffered(reader: impl Read + Send + 'a) -> Self {
        InputSource::Buffered(Box::new(reader))
    }

    /// Called in the child after `fork`: makes the channel's read end fd 0.
    ///
    /// No-op for inherited input, the child already has the real stdin.
    pub fn bind_as_child_stdin(&self, channel: &mut Channel) -> Result<(), ShellError> {
        match self {
            InputSource::Inherited => Ok(()),
            InputSource::Buffered(_) => {
                let fd = channel.read_fd()?;
                nix::unistd::dup2(fd, STDIN_FILENO).map_err(ShellError::os("dup2 stdin"))?;
                Ok(())
            }
        }
    }

    /// Called in the parent after `fork`: copies the whole stream into the
    /// channel's write end.
    ///
    /// No-op for inherited input.
    pub fn flush_to_channel(&mut self, channel: &mut Channel) -> Result<u64, ShellError> {
        match self {
            InputSource::Inherited => Ok(0),
            InputSource::Buffered(reader) => {
                let written = io::copy(reader, channel.write_end()?)?;
                Ok(written)
            }
        }
    }

    /// A reader for commands that run inside the shell process.
    pub fn reader(&mut self) -> Box<dyn Read + '_> {
        match self {
            InputSource::Inherited => Box::new(io::stdin().lock()),
            InputSource::Buffered(reader) => Box::new(reader),
        }
    }
}

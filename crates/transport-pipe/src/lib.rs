//! Pipe endpoint driver.
//!
//! The inter-process byte channel is a Unix-domain stream socket that some
//! other process listens on; this driver only connects to an existing
//! channel, it never creates one. The stream is switched to non-blocking
//! mode right after connecting, so a read with nothing buffered returns an
//! empty chunk instead of stalling the loop.
//!
//! Failure mapping at open time: a missing socket file is `NotFound`
//! (fatal), a refused connection means no instance is accepting right now
//! and maps to `Busy` (retryable), permission problems are `AccessDenied`
//! (fatal). After connecting, an EOF or reset read maps to `Disconnected`,
//! which the bridge answers with a pipe reconnect.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use core_types::endpoint::write_budget;
use core_types::{ByteEndpoint, EndpointError};

/// An open connection to the channel, in non-blocking byte mode.
#[derive(Debug)]
pub struct PipeEndpoint {
    stream: Option<UnixStream>,
    path: PathBuf,
}

impl PipeEndpoint {
    /// Connect to the channel at `path`. One attempt, no waiting; the
    /// connection manager owns the busy-availability wait.
    pub fn open(path: &Path) -> Result<Self, EndpointError> {
        let stream =
            UnixStream::connect(path).map_err(|err| classify_connect_error(path, err))?;
        stream.set_nonblocking(true).map_err(EndpointError::Io)?;

        log::debug!("opened pipe {}", path.display());
        Ok(Self {
            stream: Some(stream),
            path: path.to_path_buf(),
        })
    }
}

impl ByteEndpoint for PipeEndpoint {
    fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, EndpointError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(closed_handle());
        };

        let mut buf = vec![0u8; max];
        match stream.read(&mut buf) {
            // EOF on a stream socket: the remote side hung up.
            Ok(0) => Err(EndpointError::Disconnected),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::BrokenPipe
                ) =>
            {
                Err(EndpointError::Disconnected)
            }
            Err(err) => Err(EndpointError::Io(err)),
        }
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), EndpointError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(closed_handle());
        };

        // Non-blocking socket: short writes and WouldBlock are expected.
        // Keep pushing until the chunk is out or the budget lapses.
        let deadline = Instant::now() + write_budget(chunk.len());
        let mut offset = 0;
        while offset < chunk.len() {
            let Some(rest) = chunk.get(offset..) else {
                break;
            };
            match stream.write(rest) {
                Ok(0) => {
                    return Err(EndpointError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "pipe accepted zero bytes",
                    )));
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(EndpointError::Io(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "pipe write stalled past its budget",
                        )));
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(EndpointError::Io(err)),
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("closed pipe {}", self.path.display());
        }
    }
}

fn closed_handle() -> EndpointError {
    EndpointError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "pipe handle already closed",
    ))
}

fn classify_connect_error(path: &Path, err: io::Error) -> EndpointError {
    let target = path.display();
    match err.kind() {
        io::ErrorKind::NotFound => EndpointError::NotFound(format!("{target}: {err}")),
        io::ErrorKind::PermissionDenied => EndpointError::AccessDenied(format!("{target}: {err}")),
        // Nobody accepting on the socket right now.
        io::ErrorKind::ConnectionRefused | io::ErrorKind::WouldBlock => {
            EndpointError::Busy(format!("{target}: {err}"))
        }
        _ => EndpointError::Io(err),
    }
}

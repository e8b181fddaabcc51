//! Serial endpoint driver.
//!
//! Wraps a hardware serial device behind the [`ByteEndpoint`] seam. Framing
//! is fixed at 8 data bits / 1 stop bit / no parity. The read timeout is
//! short so a read with nothing buffered returns promptly (an empty chunk,
//! not an error); each write instead gets a generous budget of
//! 50 ms + 10 ms per byte, set for the duration of that write only.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use std::io::{self, Read, Write};
use std::time::Duration;

use core_types::endpoint::write_budget;
use core_types::{ByteEndpoint, EndpointError};
use serialport::{DataBits, Parity, SerialPort, StopBits};

/// Read timeout. Short enough that a quiet line never stalls the loop.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// An open serial device.
pub struct SerialEndpoint {
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

// `Box<dyn SerialPort>` is not `Debug`, so this can't be derived; the impl
// reports the path and whether the handle is still live.
impl std::fmt::Debug for SerialEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialEndpoint")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialEndpoint {
    /// Open and configure `path` at `baud_rate`, 8N1.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, EndpointError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|err| classify_open_error(path, err))?;

        log::debug!("opened serial port {path} at {baud_rate} baud (8N1)");
        Ok(Self {
            port: Some(port),
            path: path.to_string(),
        })
    }
}

impl ByteEndpoint for SerialEndpoint {
    fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, EndpointError> {
        let Some(port) = self.port.as_mut() else {
            return Err(closed_handle());
        };

        let mut buf = vec![0u8; max];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            // A timed-out read is the normal "nothing available" outcome.
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(err) => Err(EndpointError::Io(err)),
        }
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), EndpointError> {
        let Some(port) = self.port.as_mut() else {
            return Err(closed_handle());
        };

        // The port has a single timeout; widen it for this write, then put
        // the short read timeout back.
        port.set_timeout(write_budget(chunk.len()))
            .map_err(|err| EndpointError::Io(err.into()))?;
        let written = port.write_all(chunk).map_err(EndpointError::Io);
        let restored = port
            .set_timeout(READ_TIMEOUT)
            .map_err(|err| EndpointError::Io(err.into()));

        written?;
        restored
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::debug!("closed serial port {}", self.path);
        }
    }
}

fn closed_handle() -> EndpointError {
    EndpointError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "serial handle already closed",
    ))
}

fn classify_open_error(path: &str, err: serialport::Error) -> EndpointError {
    match err.kind() {
        serialport::ErrorKind::NoDevice => EndpointError::NotFound(format!("{path}: {err}")),
        serialport::ErrorKind::InvalidInput => EndpointError::Config(format!("{path}: {err}")),
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
            EndpointError::NotFound(format!("{path}: {err}"))
        }
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            EndpointError::AccessDenied(format!("{path}: {err}"))
        }
        _ => EndpointError::Io(err.into()),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use core_types::Recoverable;

    #[test]
    fn test_open_missing_device_is_fatal() {
        let err = SerialEndpoint::open("/dev/tty-portpipe-does-not-exist", 9600).unwrap_err();
        assert!(matches!(err, EndpointError::NotFound(_)), "got {err:?}");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_classify_no_device() {
        let err = classify_open_error(
            "/dev/ttyUSB0",
            serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged"),
        );
        assert!(matches!(err, EndpointError::NotFound(_)));
    }

    #[test]
    fn test_classify_permission_denied() {
        let err = classify_open_error(
            "/dev/ttyS0",
            serialport::Error::new(
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
                "not in dialout",
            ),
        );
        assert!(matches!(err, EndpointError::AccessDenied(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_classify_invalid_input_is_config() {
        let err = classify_open_error(
            "/dev/ttyUSB0",
            serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad settings"),
        );
        assert!(matches!(err, EndpointError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_classify_other_io_is_retryable() {
        let err = classify_open_error(
            "/dev/ttyUSB0",
            serialport::Error::new(
                serialport::ErrorKind::Io(io::ErrorKind::TimedOut),
                "transient",
            ),
        );
        assert!(matches!(err, EndpointError::Io(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_closed_handle_rejects_io() {
        let mut endpoint = SerialEndpoint {
            port: None,
            path: "/dev/ttyUSB0".into(),
        };
        assert!(endpoint.read_chunk(32).is_err());
        assert!(endpoint.write(b"x").is_err());
        // Closing a never-opened handle is a no-op.
        endpoint.close();
        endpoint.close();
    }
}

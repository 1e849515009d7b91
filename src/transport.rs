// src/transport.rs
//! Opening the byte stream the tracker reads from

use crate::{
    config::TrackerConfig,
    error::{GpsError, Result},
};
use tokio::io::AsyncRead;
use tokio_serial::SerialPortBuilderExt;

/// Opens a fresh transport each time the tracker starts.
///
/// The returned stream is owned by the reader task for the whole run and
/// closed by dropping it.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + Unpin + Send + 'static;

    /// Called from inside the tokio runtime that will drive the stream.
    fn connect(&self, config: &TrackerConfig) -> Result<Self::Stream>;
}

/// Serial port transport backed by `tokio-serial`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Stream = tokio_serial::SerialStream;

    fn connect(&self, config: &TrackerConfig) -> Result<Self::Stream> {
        tokio_serial::new(&config.port, config.baudrate)
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|e| {
                GpsError::Connection(format!("Failed to open serial port {}: {}", config.port, e))
            })
    }
}

/// Serial ports the OS knows about, as `(name, description)` pairs
pub fn list_serial_ports() -> Result<Vec<(String, String)>> {
    let ports = tokio_serial::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| (port.port_name, format!("{:?}", port.port_type)))
        .collect())
}

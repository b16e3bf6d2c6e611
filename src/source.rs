//! Sample acquisition from the serial-attached ADC
//!
//! The board streams raw bytes with no framing. Every `block_size` bytes form
//! one [`SampleBlock`]. A read that comes back short (timeout, device closed)
//! is the end of the stream, never a partially-filled block.

use serde::{Deserialize, Serialize};
use serialport::{SerialPort, SerialPortType};
use std::io::{ErrorKind, Read};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("serial read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// How raw bytes map onto signed amplitudes
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SampleEncoding {
    /// Two's-complement `i8`
    #[default]
    Signed,
    /// Offset binary: 128 is the zero level
    OffsetUnsigned,
}

impl SampleEncoding {
    pub fn decode(self, byte: u8) -> i16 {
        match self {
            SampleEncoding::Signed => byte as i8 as i16,
            SampleEncoding::OffsetUnsigned => byte as i16 - 128,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleEncoding::Signed => "signed",
            SampleEncoding::OffsetUnsigned => "offset-unsigned",
        }
    }
}

/// One block of decoded amplitudes, consumed within a single loop iteration
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Vec<i16>,
}

impl SampleBlock {
    pub fn decode(bytes: &[u8], encoding: SampleEncoding) -> Self {
        Self {
            samples: bytes.iter().map(|&b| encoding.decode(b)).collect(),
        }
    }

    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Histogram bucket for every sample: the amplitude shifted into `0..256`
    pub fn buckets(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples
            .iter()
            .map(|&s| (s as i32 + 128).clamp(0, 255) as usize)
    }
}

/// Anything that yields fixed-size sample blocks
pub trait SampleSource {
    /// `Ok(None)` means the stream ended; the caller stops reading.
    fn read_block(&mut self) -> Result<Option<SampleBlock>, SourceError>;
}

/// Block reader over any byte stream
pub struct ByteSource<R> {
    reader: R,
    encoding: SampleEncoding,
    buffer: Vec<u8>,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R, block_size: usize, encoding: SampleEncoding) -> Self {
        Self {
            reader,
            encoding,
            buffer: vec![0; block_size],
        }
    }

    /// Fill the internal buffer, returning how many bytes arrived before the
    /// stream ended or timed out
    fn fill(&mut self) -> Result<usize, SourceError> {
        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break;
                }
                Err(e) => return Err(SourceError::Io(e)),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> SampleSource for ByteSource<R> {
    fn read_block(&mut self) -> Result<Option<SampleBlock>, SourceError> {
        let filled = self.fill()?;
        if filled < self.buffer.len() {
            if filled > 0 {
                tracing::debug!(
                    "[source] short read: {} of {} bytes, treating as end of stream",
                    filled,
                    self.buffer.len()
                );
            }
            return Ok(None);
        }
        Ok(Some(SampleBlock::decode(&self.buffer, self.encoding)))
    }
}

/// Serial device owned for the lifetime of the acquisition loop.
/// The port closes when this is dropped.
pub struct SerialSource {
    port_name: String,
    inner: ByteSource<Box<dyn SerialPort>>,
}

impl SerialSource {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
        block_size: usize,
        encoding: SampleEncoding,
    ) -> Result<Self, SourceError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|source| SourceError::Open {
                port: port_name.to_string(),
                source,
            })?;

        tracing::info!(
            "[serial] opened {} at {} baud (timeout {:?}, {} bytes per block, {})",
            port_name,
            baud_rate,
            timeout,
            block_size,
            encoding.as_str()
        );

        Ok(Self {
            port_name: port_name.to_string(),
            inner: ByteSource::new(port, block_size, encoding),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl SampleSource for SerialSource {
    fn read_block(&mut self) -> Result<Option<SampleBlock>, SourceError> {
        self.inner.read_block()
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        tracing::info!("[serial] closing {}", self.port_name);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

pub fn list_ports() -> Result<Vec<PortInfo>, SourceError> {
    let ports = serialport::available_ports().map_err(SourceError::Enumerate)?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let kind = match port.port_type {
                SerialPortType::UsbPort(usb) => {
                    let product = usb.product.unwrap_or_else(|| "USB".to_string());
                    format!("{} ({:04x}:{:04x})", product, usb.vid, usb.pid)
                }
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => "Unknown".to_string(),
            };
            PortInfo {
                name: port.port_name,
                kind,
            }
        })
        .collect())
}

//! Serial-port transport (Arduino-class servo controllers).

use std::io::{self, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::Transport;

pub struct SerialTransport {
    address: String,
    baud_rate: u32,
    write_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(address: impl Into<String>, baud_rate: u32, write_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            baud_rate,
            write_timeout,
            port: None,
        }
    }
}

impl Transport for SerialTransport {
    fn address(&self) -> &str {
        &self.address
    }

    fn open(&mut self) -> io::Result<()> {
        let port = serialport::new(&self.address, self.baud_rate)
            .timeout(self.write_timeout)
            .open()?;
        log::info!(
            "serial port {} opened at {} baud",
            self.address,
            self.baud_rate
        );
        self.port = Some(port);
        Ok(())
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port not open"))?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("serial port {} closed", self.address);
        }
    }
}

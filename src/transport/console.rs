//! Dry-run transport: one command frame per line on stdout (or any writer).

use std::io::{self, Write};

use super::Transport;

pub struct ConsoleTransport {
    label: String,
    out: Box<dyn Write + Send>,
    open: bool,
}

impl ConsoleTransport {
    pub fn stdout() -> Self {
        Self::with_writer("console:stdout", Box::new(io::stdout()))
    }

    pub fn with_writer(label: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            label: label.into(),
            out,
            open: false,
        }
    }
}

impl Transport for ConsoleTransport {
    fn address(&self) -> &str {
        &self.label
    }

    fn open(&mut self) -> io::Result<()> {
        self.open = true;
        Ok(())
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "console closed"));
        }
        self.out.write_all(bytes)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn close(&mut self) {
        self.open = false;
    }
}

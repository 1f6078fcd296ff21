//! Line-oriented device link over any byte stream, typically a serial device
//! node that has already been configured for the device's baud rate.

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use robd2_core::device::DeviceLink;
use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader, Read, Write},
    path::Path,
    thread,
    time::Duration,
};
use tracing::{debug, warn};

pub struct StreamLink {
    writer: Box<dyn Write + Send>,
    lines: Receiver<String>,
}

impl StreamLink {
    /// Opens a device node for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open device port: {}", path.display()))?;
        let reader = file
            .try_clone()
            .with_context(|| format!("Failed to clone handle for: {}", path.display()))?;
        Ok(Self::from_parts(reader, file))
    }

    /// Responses are read on a dedicated thread so that `read_line` can time out.
    pub fn from_parts<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (tx, rx) = channel::unbounded();
        thread::spawn(move || {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => match String::from_utf8(buf.clone()) {
                        Ok(line) => {
                            let line = line.trim_end_matches(['\r', '\n']).to_string();
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(_) => debug!(bytes = buf.len(), "dropping undecodable response line"),
                    },
                    Err(e) => {
                        warn!(error = %e, "device read failed, closing link");
                        break;
                    }
                }
            }
        });
        Self {
            writer: Box::new(writer),
            lines: rx,
        }
    }
}

impl DeviceLink for StreamLink {
    fn send(&mut self, command: &str) -> bool {
        // Drop late responses to earlier commands.
        while self.lines.try_recv().is_ok() {}
        let written = self
            .writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .and_then(|()| self.writer.flush());
        match written {
            Ok(()) => true,
            Err(e) => {
                warn!(command, error = %e, "failed to write command");
                false
            }
        }
    }

    fn read_line(&mut self, timeout: Duration) -> Option<String> {
        self.lines.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_crlf_terminated_commands() {
        let sent = SharedBuf::default();
        let mut link = StreamLink::from_parts(Cursor::new(Vec::new()), sent.clone());
        assert!(link.send("GET INFO"));
        assert_eq!(sent.0.lock().unwrap().as_slice(), b"GET INFO\r\n");
    }

    #[test]
    fn skips_undecodable_lines_and_times_out() {
        let input = b"\xff\xfe\n20.93\r\n".to_vec();
        let mut link = StreamLink::from_parts(Cursor::new(input), SharedBuf::default());
        assert_eq!(link.read_line(Duration::from_secs(2)).as_deref(), Some("20.93"));
        assert_eq!(link.read_line(Duration::from_millis(20)), None);
    }
}

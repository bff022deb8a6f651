//! Line bridge between a [`LocalBus`] and byte streams.
//!
//! Each line is `<topic> <payload>`, the same shape `mosquitto_sub -v`
//! prints, so the binary can sit in a shell pipeline between a broker client
//! and the actuator side:
//!
//! ```text
//! mosquitto_sub -v -t '#' | friend-head run | while read t p; do mosquitto_pub -t "$t" -m "$p"; done
//! ```

use crate::bus::local::LocalBus;
use crate::bus::types::{BusError, Message};
use crossbeam_channel::Receiver;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Parse one bridge line. Blank lines and lines without a topic yield `None`.
pub fn parse_line(line: &str) -> Option<Message> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (topic, payload) = match line.split_once(char::is_whitespace) {
        Some((topic, payload)) => (topic, payload.trim()),
        None => (line, ""),
    };
    Some(Message::new(topic, payload))
}

/// Render a message as a bridge line (without the trailing newline).
pub fn format_line(message: &Message) -> String {
    format!("{} {}", message.topic, message.payload)
}

/// Feed lines from `input` into `bus` until EOF or a read error.
///
/// Lines for topics the bus is not subscribed to are discarded there.
pub fn spawn_reader<R>(bus: Arc<LocalBus>, input: R) -> JoinHandle<Result<(), BusError>>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.lines() {
            let line = line.map_err(|e| {
                tracing::warn!("bridge input closed: {e}");
                BusError::Io(e)
            })?;
            if let Some(message) = parse_line(&line) {
                bus.inject(message);
            }
        }
        tracing::debug!("bridge input reached EOF");
        Ok(())
    })
}

/// Write every message from `outbound` to `output`, one per line.
///
/// The thread exits once the channel closes (the bus disconnected) or the
/// output fails.
pub fn spawn_writer<W>(outbound: Receiver<Message>, mut output: W) -> JoinHandle<Result<(), BusError>>
where
    W: Write + Send + 'static,
{
    thread::spawn(move || {
        for message in outbound.iter() {
            let result = writeln!(output, "{}", format_line(&message)).and_then(|_| output.flush());
            if let Err(e) = result {
                tracing::warn!(topic = %message.topic, "bridge output failed: {e}");
                return Err(BusError::Io(e));
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::types::Bus;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("/touch L_HEAD=1,R_HEAD=0"),
            Some(Message::new("/touch", "L_HEAD=1,R_HEAD=0"))
        );
        assert_eq!(parse_line("  /radar   1  "), Some(Message::new("/radar", "1")));
        assert_eq!(parse_line("/sleep"), Some(Message::new("/sleep", "")));
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(&Message::new("/screen", "happy")), "/screen happy");
    }

    #[test]
    fn test_reader_injects_subscribed_topics() {
        let bus = Arc::new(LocalBus::new());
        bus.subscribe("/touch").unwrap();

        let input = Cursor::new("/touch L_HEAD=1\n/light rainbow\n\n/touch L_HEAD=0\n");
        spawn_reader(Arc::clone(&bus), input).join().unwrap().unwrap();

        let received: Vec<String> = bus.receiver().try_iter().map(|m| m.payload).collect();
        assert_eq!(received, vec!["L_HEAD=1", "L_HEAD=0"]);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_drains_until_disconnect() {
        let bus = LocalBus::new();
        let out = SharedBuf::default();
        let handle = spawn_writer(bus.tap(), out.clone());

        bus.publish("/haptic", "1").unwrap();
        bus.publish("/servo", "ear1").unwrap();
        bus.disconnect();
        handle.join().unwrap().unwrap();

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "/haptic 1\n/servo ear1\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_reports_output_failure() {
        let bus = LocalBus::new();
        let handle = spawn_writer(bus.tap(), BrokenPipe);

        bus.publish("/haptic", "1").unwrap();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(BusError::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }

    struct FailingInput;

    impl std::io::Read for FailingInput {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "garbled"))
        }
    }

    #[test]
    fn test_reader_reports_input_failure() {
        let bus = Arc::new(LocalBus::new());
        let input = std::io::BufReader::new(FailingInput);
        let result = spawn_reader(bus, input).join().unwrap();
        assert!(matches!(result, Err(BusError::Io(_))));
    }
}

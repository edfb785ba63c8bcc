//! Line-oriented command channel shared with the diagnostic output.

use embedded_io::{Read, ReadReady};
use heapless::Vec;
use log::{debug, warn};

/// Command that reboots into the programming mode.
pub const BOOT_COMMAND: &str = "boot";

/// Longest accepted command line, excluding the newline.
pub const MAX_LINE: usize = 32;

/// A recognized administrative command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Reboot into the programming mode.
    Boot,
}

/// The terminal reboot action.
pub trait Bootloader {
    /// Reboots the controller into its programming mode. Never returns.
    fn reboot_to_bootloader(&mut self) -> !;
}

/// Non-blocking reader that assembles newline-terminated command lines.
pub struct AdminChannel<R> {
    port: R,
    line: Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl<R: Read + ReadReady> AdminChannel<R> {
    /// Wraps a serial port.
    pub fn new(port: R) -> Self {
        Self {
            port,
            line: Vec::new(),
            overflowed: false,
        }
    }

    /// Consumes whatever input is ready, stopping after the first complete line.
    ///
    /// Returns the command on that line, if it was one. Partial lines are kept
    /// for the next poll.
    pub fn poll(&mut self) -> Option<AdminCommand> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read_ready() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => {
                    debug!("Admin channel not readable: {err:?}");
                    return None;
                }
            }
            match self.port.read(&mut byte) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    debug!("Admin channel read failed: {err:?}");
                    return None;
                }
            }

            if byte[0] == b'\n' {
                return self.finish_line();
            }
            if self.line.push(byte[0]).is_err() {
                self.overflowed = true;
            }
        }
    }

    fn finish_line(&mut self) -> Option<AdminCommand> {
        let overflowed = core::mem::take(&mut self.overflowed);
        let command = if overflowed {
            warn!("Dropping admin line longer than {MAX_LINE} bytes");
            None
        } else {
            parse_command(&self.line)
        };
        self.line.clear();
        command
    }
}

fn parse_command(line: &[u8]) -> Option<AdminCommand> {
    let Ok(text) = core::str::from_utf8(line) else {
        debug!("Ignoring non-UTF-8 admin line");
        return None;
    };
    let text = text.trim();
    if text.eq_ignore_ascii_case(BOOT_COMMAND) {
        Some(AdminCommand::Boot)
    } else {
        if !text.is_empty() {
            debug!("Ignoring admin line {text:?}");
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use embedded_io::{ErrorKind, ErrorType};
    use std::collections::VecDeque;

    /// Serial port fed from a byte queue.
    #[derive(Default)]
    pub(crate) struct FakePort {
        pub rx: VecDeque<u8>,
    }

    impl FakePort {
        pub fn with(input: &[u8]) -> Self {
            Self {
                rx: input.iter().copied().collect(),
            }
        }
    }

    impl ErrorType for FakePort {
        type Error = ErrorKind;
    }

    impl ReadReady for FakePort {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.rx.is_empty())
        }
    }

    impl Read for FakePort {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                let Some(byte) = self.rx.pop_front() else { break };
                buf[n] = byte;
                n += 1;
            }
            Ok(n)
        }
    }

    #[test]
    fn boot_in_any_case_is_recognized() {
        for input in [&b"boot\n"[..], &b"BOOT\n"[..], &b"  Boot \r\n"[..]] {
            let mut channel = AdminChannel::new(FakePort::with(input));
            assert_eq!(channel.poll(), Some(AdminCommand::Boot));
        }
    }

    #[test]
    fn other_lines_are_ignored() {
        let mut channel = AdminChannel::new(FakePort::with(b"reboot\nbooty\n\n"));
        assert_eq!(channel.poll(), None);
        assert_eq!(channel.poll(), None);
        assert_eq!(channel.poll(), None);
        assert_eq!(channel.poll(), None);
    }

    #[test]
    fn only_one_line_is_consumed_per_poll() {
        let mut channel = AdminChannel::new(FakePort::with(b"status\nboot\n"));
        assert_eq!(channel.poll(), None);
        assert_eq!(channel.port.rx.len(), 5);
        assert_eq!(channel.poll(), Some(AdminCommand::Boot));
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut channel = AdminChannel::new(FakePort::with(b"bo"));
        assert_eq!(channel.poll(), None);
        channel.port.rx.extend(b"ot\n".iter().copied());
        assert_eq!(channel.poll(), Some(AdminCommand::Boot));
    }

    #[test]
    fn overlong_line_is_dropped_whole() {
        let mut input = [b'x'; MAX_LINE + 8].to_vec();
        input.extend_from_slice(b"boot\nboot\n");
        let mut channel = AdminChannel::new(FakePort::with(&input));
        assert_eq!(channel.poll(), None);
        assert_eq!(channel.poll(), Some(AdminCommand::Boot));
    }
}

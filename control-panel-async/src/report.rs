//! One-line diagnostics printed for every button event.
//!
//! ```text
//! PRESS HORN row=0 col=0
//! RELEASE UNMAPPED row=0 col=9
//! PRESS GPIO 4
//! ```

use core::fmt;

/// A button event as printed on the diagnostic channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report<'a> {
    /// A bound button.
    Button {
        /// `true` for a press.
        pressed: bool,
        /// Button name.
        name: &'a str,
        /// Matrix row.
        row: u8,
        /// Matrix column.
        column: u8,
    },
    /// A matrix position without a binding.
    Unmapped {
        /// `true` for a press.
        pressed: bool,
        /// Matrix row.
        row: u8,
        /// Matrix column.
        column: u8,
    },
    /// An auxiliary input line of the keypad expander.
    Gpio {
        /// `true` for a press.
        pressed: bool,
        /// Line number.
        pin: u8,
    },
}

/// Why a diagnostic line could not be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseReportError {
    /// The line starts with neither `PRESS` nor `RELEASE`.
    Action,
    /// A `row=`, `col=` or GPIO field is missing or not a number.
    Field,
}

const UNMAPPED: &str = "UNMAPPED";

impl<'a> Report<'a> {
    /// `true` for a press, `false` for a release.
    pub fn pressed(&self) -> bool {
        match *self {
            Report::Button { pressed, .. }
            | Report::Unmapped { pressed, .. }
            | Report::Gpio { pressed, .. } => pressed,
        }
    }

    /// Reads back a line produced by the `Display` implementation.
    ///
    /// Button names may contain spaces, so the position fields are taken from
    /// the end of the line.
    pub fn parse(line: &'a str) -> Result<Self, ParseReportError> {
        let line = line.trim();
        let (pressed, rest) = if let Some(rest) = line.strip_prefix("PRESS ") {
            (true, rest)
        } else if let Some(rest) = line.strip_prefix("RELEASE ") {
            (false, rest)
        } else {
            return Err(ParseReportError::Action);
        };
        let rest = rest.trim_start();

        if let Some(pin) = rest.strip_prefix("GPIO ") {
            let pin = pin.trim().parse().map_err(|_| ParseReportError::Field)?;
            return Ok(Report::Gpio { pressed, pin });
        }

        let (rest, column) = rest.rsplit_once(" col=").ok_or(ParseReportError::Field)?;
        let (name, row) = rest.rsplit_once(" row=").ok_or(ParseReportError::Field)?;
        let row = row.parse().map_err(|_| ParseReportError::Field)?;
        let column = column.parse().map_err(|_| ParseReportError::Field)?;
        let name = name.trim();

        if name == UNMAPPED {
            Ok(Report::Unmapped { pressed, row, column })
        } else {
            Ok(Report::Button {
                pressed,
                name,
                row,
                column,
            })
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.pressed() { "PRESS" } else { "RELEASE" };
        match self {
            Report::Button {
                name, row, column, ..
            } => write!(f, "{action} {name} row={row} col={column}"),
            Report::Unmapped { row, column, .. } => {
                write!(f, "{action} {UNMAPPED} row={row} col={column}")
            }
            Report::Gpio { pin, .. } => write!(f, "{action} GPIO {pin}"),
        }
    }
}

//! Error types for the TCA8418 driver.

use core::fmt::{self, Debug};

/// The error type returned by the bring-up operations of the driver.
pub enum Tca8418Error<TI2CERR> {
    /// The I2C transaction failed, usually because nothing acknowledged the address.
    Bus(TI2CERR),
    /// The requested keypad matrix does not fit the chip.
    InvalidMatrix {
        /// Requested number of rows.
        rows: u8,
        /// Requested number of columns.
        cols: u8,
    },
}

impl<TI2CERR: Debug> Debug for Tca8418Error<TI2CERR> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "Bus({err:?})"),
            Self::InvalidMatrix { rows, cols } => {
                write!(f, "InvalidMatrix({rows}x{cols})")
            }
        }
    }
}

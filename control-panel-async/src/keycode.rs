//! Decoding of the packed key event bytes queued by the keypad expander.
//!
//! Bit 7 is set for a press and clear for a release. The low seven bits carry a
//! 1-based key number: 1..=96 are matrix positions numbered row-major over a
//! 10-column grid, 97 and up are the chip's auxiliary GPI lines. A key number of
//! zero marks an empty queue.

/// Press flag in a key event byte.
pub const PRESS_FLAG: u8 = 0x80;
/// Key number bits in a key event byte.
pub const KEY_MASK: u8 = 0x7F;
/// Highest key number that addresses the matrix.
pub const LAST_MATRIX_KEY: u8 = 96;
/// Width of the chip's native key numbering, independent of the wired matrix.
pub const NATIVE_COLUMNS: u8 = 10;
/// Key number of auxiliary GPI line 0.
pub const FIRST_GPI_KEY: u8 = LAST_MATRIX_KEY + 1;

/// What produced a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// A keyswitch in the scanned matrix.
    Matrix {
        /// Matrix row.
        row: u8,
        /// Matrix column.
        column: u8,
    },
    /// An auxiliary input line that is not part of the matrix.
    Gpi {
        /// Zero-based line number.
        pin: u8,
    },
}

/// A decoded key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// `true` for a press, `false` for a release.
    pub pressed: bool,
    /// Where the event came from.
    pub source: KeySource,
}

impl KeyEvent {
    /// Decodes one event byte. Returns `None` for the empty-queue marker.
    pub const fn decode(code: u8) -> Option<Self> {
        let pressed = code & PRESS_FLAG != 0;
        let key = code & KEY_MASK;

        let source = match key {
            0 => return None,
            1..=LAST_MATRIX_KEY => {
                let index = key - 1;
                KeySource::Matrix {
                    row: index / NATIVE_COLUMNS,
                    column: index % NATIVE_COLUMNS,
                }
            }
            _ => KeySource::Gpi {
                pin: key - FIRST_GPI_KEY,
            },
        };

        Some(Self { pressed, source })
    }
}

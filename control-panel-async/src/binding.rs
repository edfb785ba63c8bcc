//! Static bindings from physical matrix positions to named buttons and their
//! indicator pixels.

use log::warn;

/// Rows of the matrix wired straight to the controller.
pub const LOCAL_ROWS: usize = 5;
/// Columns of the matrix wired straight to the controller.
pub const LOCAL_COLS: usize = 2;
/// Number of positions in the local matrix.
pub const LOCAL_KEYS: usize = LOCAL_ROWS * LOCAL_COLS;

/// Rows scanned by the keypad expander.
pub const EXPANDER_ROWS: usize = 8;
/// Columns scanned by the keypad expander.
pub const EXPANDER_COLS: usize = 10;
/// Number of slots in the expander matrix.
pub const EXPANDER_SLOTS: usize = EXPANDER_ROWS * EXPANDER_COLS;

/// Pixels on the top strip.
pub const TOP_PIXELS: usize = 18;
/// Pixels on the bottom strip.
pub const BOTTOM_PIXELS: usize = 45;

/// One of the two LED strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strip {
    /// Strip behind the top board.
    Top,
    /// Strip behind the bottom board.
    Bottom,
}

impl Strip {
    /// Number of pixels on the strip.
    pub const fn len(self) -> usize {
        match self {
            Strip::Top => TOP_PIXELS,
            Strip::Bottom => BOTTOM_PIXELS,
        }
    }
}

/// The indicator pixel of a button. `pixel: None` means the button has no light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedBinding {
    /// Strip the pixel lives on.
    pub strip: Strip,
    /// Index into the strip, if the button is lit at all.
    pub pixel: Option<u8>,
}

impl LedBinding {
    /// A binding to `pixel` on `strip`.
    pub const fn new(strip: Strip, pixel: u8) -> Self {
        Self { strip, pixel: Some(pixel) }
    }

    /// A binding without visual feedback.
    pub const fn unlit(strip: Strip) -> Self {
        Self { strip, pixel: None }
    }
}

/// Which keyswitch matrix a button is wired into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matrix {
    /// The 5x2 matrix scanned in software.
    Local,
    /// The 8x10 matrix scanned by the keypad expander.
    Expander,
}

/// A named button at a fixed matrix position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalButton {
    /// Name printed in diagnostics.
    pub name: &'static str,
    /// Matrix the button is wired into.
    pub matrix: Matrix,
    /// Matrix row.
    pub row: u8,
    /// Matrix column.
    pub column: u8,
    /// Indicator pixel.
    pub led: LedBinding,
}

impl LogicalButton {
    /// A local matrix button lit by `pixel` on the top strip.
    pub const fn local(name: &'static str, row: u8, column: u8, pixel: u8) -> Self {
        Self {
            name,
            matrix: Matrix::Local,
            row,
            column,
            led: LedBinding::new(Strip::Top, pixel),
        }
    }

    /// An expander matrix button lit by `pixel` on the bottom strip.
    pub const fn expander(name: &'static str, row: u8, column: u8, pixel: u8) -> Self {
        Self {
            name,
            matrix: Matrix::Expander,
            row,
            column,
            led: LedBinding::new(Strip::Bottom, pixel),
        }
    }
}

/// Top board, ordered so that entry `row * 2 + column` sits at that position.
#[rustfmt::skip]
pub static LOCAL_BUTTONS: [LogicalButton; LOCAL_KEYS] = [
    LogicalButton::local("HORN",          0, 0, 3),
    LogicalButton::local("SIREN",         0, 1, 2),
    LogicalButton::local("LIGHT FRONT",   1, 0, 11),
    LogicalButton::local("LIGHT RIGHT",   1, 1, 14),
    LogicalButton::local("LIGHT LEFT",    2, 0, 15),
    LogicalButton::local("SIREN SHARP",   2, 1, 0),
    LogicalButton::local("MANUAL",        3, 0, 4),
    LogicalButton::local("SIREN TOOTH",   3, 1, 1),
    LogicalButton::local("ORANGE BUTTON", 4, 0, 12),
    LogicalButton::local("PA",            4, 1, 13),
];

/// Bottom board, wired into the expander. Positions not listed are unpopulated.
#[rustfmt::skip]
pub static EXPANDER_BUTTONS: [LogicalButton; 38] = [
    LogicalButton::expander("NUM_3",      0, 0, 36),
    LogicalButton::expander("NUM_6",      0, 1, 35),
    LogicalButton::expander("NUM_9",      0, 2, 34),
    LogicalButton::expander("NUM_#",      0, 3, 33),
    LogicalButton::expander("COMPUTER",   0, 4, 32),
    LogicalButton::expander("HOME",       0, 5, 25),

    LogicalButton::expander("NUM_2",      1, 0, 37),
    LogicalButton::expander("NUM_5",      1, 1, 38),
    LogicalButton::expander("NUM_8",      1, 2, 39),
    LogicalButton::expander("NUM_0",      1, 3, 40),
    LogicalButton::expander("DPAD_RIGHT", 1, 4, 31),
    LogicalButton::expander("DPAD_DOWN",  1, 5, 28),

    LogicalButton::expander("NUM_1",      2, 0, 44),
    LogicalButton::expander("NUM_4",      2, 1, 43),
    LogicalButton::expander("NUM_7",      2, 2, 42),
    LogicalButton::expander("NUM_*",      2, 3, 41),
    LogicalButton::expander("DPAD_UP",    2, 4, 30),
    LogicalButton::expander("DPAD_LEFT",  2, 5, 29),

    LogicalButton::expander("T_ROW5",     3, 6, 0),
    LogicalButton::expander("LIGHTBULB",  3, 7, 12),
    LogicalButton::expander("B_ROW5",     3, 8, 23),
    LogicalButton::expander("P5",         3, 9, 24),

    LogicalButton::expander("T_ROW4",     4, 6, 1),
    LogicalButton::expander("DAY/NIGHT",  4, 7, 11),
    LogicalButton::expander("B_ROW4",     4, 8, 21),
    LogicalButton::expander("P4",         4, 9, 22),

    LogicalButton::expander("T_ROW3",     5, 6, 2),
    LogicalButton::expander("BRIGHT -",   5, 7, 10),
    LogicalButton::expander("B_ROW3",     5, 8, 19),
    LogicalButton::expander("P3",         5, 9, 20),

    LogicalButton::expander("T_ROW2",     6, 6, 3),
    LogicalButton::expander("BRIGHT +",   6, 7, 9),
    LogicalButton::expander("B_ROW2",     6, 8, 17),
    LogicalButton::expander("P2",         6, 9, 18),

    LogicalButton::expander("T_ROW1",     7, 6, 4),
    LogicalButton::expander("POWER",      7, 7, 5),
    LogicalButton::expander("B_ROW1",     7, 8, 15),
    LogicalButton::expander("P1",         7, 9, 16),
];

/// Lookup from matrix positions to buttons for both matrices.
///
/// The local table is dense and indexed directly. The expander table is sparse,
/// so it is spread into 80 optional slots keyed by `row * 10 + column`.
pub struct BindingTable {
    local: &'static [LogicalButton; LOCAL_KEYS],
    expander: &'static [LogicalButton],
    slots: [Option<&'static LogicalButton>; EXPANDER_SLOTS],
}

impl BindingTable {
    /// The panel's own tables.
    pub fn new() -> Self {
        Self::from_tables(&LOCAL_BUTTONS, &EXPANDER_BUTTONS)
    }

    /// Builds a table from custom button lists.
    ///
    /// Expander entries outside the 8x10 matrix are skipped. When two entries
    /// claim the same position, the later one wins.
    pub fn from_tables(
        local: &'static [LogicalButton; LOCAL_KEYS],
        expander: &'static [LogicalButton],
    ) -> Self {
        let mut slots = [None; EXPANDER_SLOTS];
        for button in expander {
            let Some(slot) = expander_slot(button.row, button.column) else {
                warn!(
                    "{} is outside the expander matrix (row={} col={})",
                    button.name, button.row, button.column
                );
                continue;
            };
            if let Some(previous) = slots[slot].replace(button) {
                warn!("{} shadows {} at slot {slot}", button.name, previous.name);
            }
        }

        Self { local, expander, slots }
    }

    /// Button at a local matrix position.
    pub fn local(&self, row: u8, column: u8) -> Option<&'static LogicalButton> {
        let local: &'static [LogicalButton; LOCAL_KEYS] = self.local;
        if row as usize >= LOCAL_ROWS || column as usize >= LOCAL_COLS {
            return None;
        }
        let button = &local[row as usize * LOCAL_COLS + column as usize];
        (button.row == row && button.column == column).then_some(button)
    }

    /// Button at an expander matrix position, `None` for unpopulated slots.
    pub fn expander(&self, row: u8, column: u8) -> Option<&'static LogicalButton> {
        expander_slot(row, column).and_then(|slot| self.slots[slot])
    }

    /// Every button, local matrix first.
    pub fn buttons(&self) -> impl Iterator<Item = &'static LogicalButton> {
        let (local, expander): (&'static [LogicalButton; LOCAL_KEYS], &'static [LogicalButton]) =
            (self.local, self.expander);
        local.iter().chain(expander.iter())
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

fn expander_slot(row: u8, column: u8) -> Option<usize> {
    let (row, column) = (row as usize, column as usize);
    (row < EXPANDER_ROWS && column < EXPANDER_COLS).then_some(row * EXPANDER_COLS + column)
}

//! Software scan of the matrix wired straight to the controller.
//!
//! Rows are push-pull outputs idling high. Columns are inputs with pull-ups, so
//! a closed switch pulls its column low while its row is driven low.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

/// Row and column pins of a directly wired keyswitch matrix.
pub struct LocalMatrix<O, I, const ROWS: usize, const COLS: usize> {
    rows: [O; ROWS],
    columns: [I; COLS],
    settle_us: u32,
}

impl<O: OutputPin, I: InputPin, const ROWS: usize, const COLS: usize> LocalMatrix<O, I, ROWS, COLS> {
    /// Takes ownership of the pins and parks every row high.
    ///
    /// # Arguments
    ///
    /// * `rows` - Row strobe outputs.
    /// * `columns` - Column inputs, pulled up.
    /// * `settle_us` - Delay between driving a row and sampling the columns.
    pub fn new(mut rows: [O; ROWS], columns: [I; COLS], settle_us: u32) -> Self {
        for row in rows.iter_mut() {
            row.set_high().ok();
        }
        Self {
            rows,
            columns,
            settle_us,
        }
    }

    /// Strobes each row in turn and returns the raw grid, `true` where a switch is closed.
    ///
    /// Pin errors read as an open switch.
    pub async fn scan<D: DelayNs>(&mut self, delay: &mut D) -> [[bool; COLS]; ROWS] {
        let mut raw = [[false; COLS]; ROWS];

        for (row, samples) in self.rows.iter_mut().zip(raw.iter_mut()) {
            row.set_low().ok();
            delay.delay_us(self.settle_us).await;

            for (column, sample) in self.columns.iter_mut().zip(samples.iter_mut()) {
                *sample = column.is_low().unwrap_or(false);
            }

            row.set_high().ok();
        }

        raw
    }
}

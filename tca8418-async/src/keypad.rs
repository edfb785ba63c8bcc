//! Core implementation of the TCA8418 keypad scan controller driver.

use embedded_hal_async::i2c::{I2c, SevenBitAddress};
use log::{debug, trace};

use crate::Tca8418Error;

/// Bus address of the TCA8418 (fixed by the part).
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x34;

/// Largest keypad matrix the chip can scan.
pub const MAX_ROWS: u8 = 8;
/// Largest keypad matrix the chip can scan.
pub const MAX_COLS: u8 = 10;

/// Depth of the on-chip key event FIFO.
pub const FIFO_DEPTH: usize = 10;

/// Register addresses.
pub mod reg {
    /// Configuration register.
    pub const CFG: u8 = 0x01;
    /// Interrupt status register (write 1 to clear).
    pub const INT_STAT: u8 = 0x02;
    /// Key lock and event counter register.
    pub const KEY_LCK_EC: u8 = 0x03;
    /// Head of the key event FIFO.
    pub const KEY_EVENT_A: u8 = 0x04;
    /// GPIO interrupt status, rows 0-7.
    pub const GPIO_INT_STAT_1: u8 = 0x11;
    /// GPIO interrupt status, columns 0-7.
    pub const GPIO_INT_STAT_2: u8 = 0x12;
    /// GPIO interrupt status, columns 8-9.
    pub const GPIO_INT_STAT_3: u8 = 0x13;
    /// GPIO interrupt enable, first of three.
    pub const GPIO_INT_EN_1: u8 = 0x1A;
    /// Keypad or GPIO selection, first of three.
    pub const KP_GPIO_1: u8 = 0x1D;
    /// GPI event mode, first of three.
    pub const GPI_EM_1: u8 = 0x20;
    /// GPIO direction, first of three.
    pub const GPIO_DIR_1: u8 = 0x23;
    /// GPIO interrupt level, first of three.
    pub const GPIO_INT_LVL_1: u8 = 0x26;
}

/// `INT_STAT` bit set while key events are queued.
pub const INT_STAT_K_INT: u8 = 0x01;
/// `INT_STAT` bit set on a GPI interrupt.
pub const INT_STAT_GPI_INT: u8 = 0x02;

const CFG_KE_IEN: u8 = 0x01;
const CFG_GPI_IEN: u8 = 0x02;
const KEY_EVENT_COUNT_MASK: u8 = 0x0F;

/// A driver for the TCA8418 keypad scan controller.
pub struct Tca8418<I2cType: I2c<SevenBitAddress>> {
    i2c: I2cType,
    address: SevenBitAddress,
}

impl<I2cType: I2c<SevenBitAddress>> Tca8418<I2cType> {
    /// Creates a new `Tca8418` at the default bus address.
    ///
    /// # Arguments
    ///
    /// * `i2c` - An I2C peripheral that implements `embedded-hal-async::i2c::I2c`.
    pub fn new(i2c: I2cType) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    /// Creates a new `Tca8418` at a custom bus address.
    pub fn with_address(i2c: I2cType, address: SevenBitAddress) -> Self {
        Self { i2c, address }
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I2cType {
        self.i2c
    }

    /// Brings the chip up for polling.
    ///
    /// Every pin starts as an event-generating GPIO input, then the first
    /// `rows` row pins and `cols` column pins are switched to keypad scanning.
    /// Stale events and interrupt flags are flushed and both key and GPI
    /// interrupts are enabled so that `INT_STAT` reflects queued work.
    ///
    /// The first bus write doubles as presence detection: a missing chip fails
    /// with [`Tca8418Error::Bus`].
    pub async fn init(&mut self, rows: u8, cols: u8) -> Result<(), Tca8418Error<I2cType::Error>> {
        if rows > MAX_ROWS || cols > MAX_COLS {
            return Err(Tca8418Error::InvalidMatrix { rows, cols });
        }

        for offset in 0..3 {
            self.write_register(reg::GPIO_DIR_1 + offset, 0x00)
                .await
                .map_err(Tca8418Error::Bus)?;
            self.write_register(reg::GPI_EM_1 + offset, 0xFF)
                .await
                .map_err(Tca8418Error::Bus)?;
            self.write_register(reg::GPIO_INT_LVL_1 + offset, 0x00)
                .await
                .map_err(Tca8418Error::Bus)?;
            self.write_register(reg::GPIO_INT_EN_1 + offset, 0xFF)
                .await
                .map_err(Tca8418Error::Bus)?;
        }

        self.configure_matrix(rows, cols)
            .await
            .map_err(Tca8418Error::Bus)?;
        let stale = self.flush().await.map_err(Tca8418Error::Bus)?;
        if stale > 0 {
            debug!("Discarded {stale} stale key events");
        }
        self.enable_interrupts().await.map_err(Tca8418Error::Bus)?;

        Ok(())
    }

    /// Selects which row and column pins take part in keypad scanning.
    pub async fn configure_matrix(&mut self, rows: u8, cols: u8) -> Result<(), I2cType::Error> {
        let (kp_gpio_1, kp_gpio_2, kp_gpio_3) = matrix_masks(rows, cols);
        self.write_register(reg::KP_GPIO_1, kp_gpio_1).await?;
        self.write_register(reg::KP_GPIO_1 + 1, kp_gpio_2).await?;
        self.write_register(reg::KP_GPIO_1 + 2, kp_gpio_3).await
    }

    /// Enables key event and GPI interrupts, keeping the other `CFG` bits.
    pub async fn enable_interrupts(&mut self) -> Result<(), I2cType::Error> {
        let cfg = self.read_register(reg::CFG).await?;
        self.write_register(reg::CFG, cfg | CFG_KE_IEN | CFG_GPI_IEN)
            .await
    }

    /// Drains the event FIFO and acknowledges every pending interrupt.
    ///
    /// Returns the number of events that were discarded.
    pub async fn flush(&mut self) -> Result<usize, I2cType::Error> {
        let mut drained = 0;
        while drained < FIFO_DEPTH {
            if self.next_event().await? == 0 {
                break;
            }
            drained += 1;
        }

        for offset in 0..3 {
            self.read_register(reg::GPIO_INT_STAT_1 + offset).await?;
        }
        self.write_register(reg::INT_STAT, INT_STAT_K_INT | INT_STAT_GPI_INT)
            .await?;

        Ok(drained)
    }

    /// Returns `true` while the FIFO holds at least one event.
    pub async fn available(&mut self) -> Result<bool, I2cType::Error> {
        Ok(self.event_count().await? > 0)
    }

    /// Number of events currently queued in the FIFO.
    pub async fn event_count(&mut self) -> Result<u8, I2cType::Error> {
        Ok(self.read_register(reg::KEY_LCK_EC).await? & KEY_EVENT_COUNT_MASK)
    }

    /// Pops the next packed key event. `0` means the FIFO is empty.
    pub async fn next_event(&mut self) -> Result<u8, I2cType::Error> {
        self.read_register(reg::KEY_EVENT_A).await
    }

    /// Reads a single register.
    pub async fn read_register(&mut self, register: u8) -> Result<u8, I2cType::Error> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await?;
        trace!("TCA8418 read {register:#04x} -> {:#04x}", buf[0]);
        Ok(buf[0])
    }

    /// Writes a single register.
    pub async fn write_register(&mut self, register: u8, value: u8) -> Result<(), I2cType::Error> {
        trace!("TCA8418 write {register:#04x} <- {value:#04x}");
        self.i2c.write(self.address, &[register, value]).await
    }
}

/// Bit masks for `KP_GPIO_1..3`: rows live in the first register, columns 0-7
/// in the second and columns 8-9 in the third.
fn matrix_masks(rows: u8, cols: u8) -> (u8, u8, u8) {
    let low_bits = |n: u8| -> u8 {
        match n {
            0 => 0,
            n if n >= 8 => 0xFF,
            n => (1u8 << n) - 1,
        }
    };

    let rows_mask = low_bits(rows);
    let cols_low = low_bits(cols.min(8));
    let cols_high = low_bits(cols.saturating_sub(8));
    (rows_mask, cols_low, cols_high)
}

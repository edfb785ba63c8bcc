//! An asynchronous, `no_std` driver for the TCA8418 keypad scan controller.
//!
//! The TCA8418 scans a keyswitch matrix of up to 8 rows by 10 columns on its own
//! and queues packed key-event bytes in a 10-deep FIFO. This driver exposes the
//! register-level operations needed to bring the chip up and to drain that
//! queue by polling, without relying on the interrupt line.
//!
//! # Usage
//!
//! Any I2C peripheral implementing `embedded-hal-async::i2c::I2c` works.
//!
//! ```ignore
//! use tca8418_async::{reg, Tca8418, INT_STAT_K_INT};
//!
//! let mut keypad = Tca8418::new(i2c);
//! keypad.init(8, 10).await?;
//!
//! loop {
//!     let status = keypad.read_register(reg::INT_STAT).await?;
//!     if status & INT_STAT_K_INT != 0 {
//!         while keypad.available().await? {
//!             let code = keypad.next_event().await?;
//!             if code == 0 {
//!                 break;
//!             }
//!             // log::info!("Key event {code:#04x}");
//!         }
//!         keypad.write_register(reg::INT_STAT, INT_STAT_K_INT).await?;
//!     }
//! }
//! ```

#![no_std]

mod err;
pub mod keypad;

pub use err::Tca8418Error;
pub use keypad::*;

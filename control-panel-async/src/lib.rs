//! Button event pipeline for a control panel with two keyswitch matrices and
//! two strips of indicator LEDs.
//!
//! The bottom board's 8x10 matrix is scanned by a TCA8418 keypad expander and
//! polled over I2C. The top board's 5x2 matrix is wired straight to the
//! controller and scanned and debounced in software. Every button has a fixed
//! name and an indicator pixel that is amber while the button rests and cyan
//! while it is held. Each event is printed as a one-line report, and the same
//! serial link accepts a `boot` command that reboots into the programming mode.
//!
//! # Usage
//!
//! ```ignore
//! use control_panel_async::{
//!     AdminChannel, BindingTable, LedFeedback, LocalMatrix, Panel, PanelConfig,
//! };
//! use apa102_spi::{Apa102, PixelOrder};
//! use tca8418_async::Tca8418;
//!
//! let config = PanelConfig::default();
//!
//! let mut keypad = Tca8418::new(i2c);
//! let expander = match keypad.init(8, 10).await {
//!     Ok(()) => Some(keypad),
//!     Err(err) => {
//!         log::warn!("TCA8418 not found: {err:?}");
//!         None
//!     }
//! };
//!
//! let matrix = LocalMatrix::new(rows, columns, config.row_settle_us);
//! let top = Apa102::new_with_options(top_spi, 4, true, PixelOrder::BRG);
//! let bottom = Apa102::new_with_options(bottom_spi, 4, true, PixelOrder::BRG);
//! let leds = LedFeedback::new(top, bottom, &config);
//! let mut panel = Panel::new(expander, matrix, leds, BindingTable::new(), config);
//! panel.init().ok();
//!
//! let mut admin = AdminChannel::new(serial);
//! panel.run(&mut admin, &mut bootloader, embassy_time::Delay).await
//! ```

#![no_std]

pub mod admin;
pub mod binding;
pub mod config;
pub mod debounce;
pub mod expander;
pub mod keycode;
pub mod leds;
pub mod matrix;
pub mod report;
pub mod router;

pub use admin::{AdminChannel, AdminCommand, Bootloader};
pub use binding::{BindingTable, LedBinding, LogicalButton, Matrix, Strip};
pub use config::PanelConfig;
pub use debounce::{DebounceEvent, DebounceState, Debouncer};
pub use expander::KeyEventSource;
pub use keycode::{KeyEvent, KeySource};
pub use leds::LedFeedback;
pub use matrix::LocalMatrix;
pub use report::{ParseReportError, Report};
pub use router::{Cycle, Panel};

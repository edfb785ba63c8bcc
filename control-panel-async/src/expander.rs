//! The register-level view of the keypad expander the router polls.

use embedded_hal_async::i2c::{I2c, SevenBitAddress};
use tca8418_async::Tca8418;

/// A keypad scan controller that queues packed key event bytes.
#[allow(async_fn_in_trait)]
pub trait KeyEventSource {
    /// Bus error type.
    type Error: core::fmt::Debug;

    /// Reads one register.
    async fn read_register(&mut self, register: u8) -> Result<u8, Self::Error>;

    /// Writes one register.
    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// `true` while events are queued.
    async fn available(&mut self) -> Result<bool, Self::Error>;

    /// Pops the next packed event byte, `0` when the queue is empty.
    async fn next_event(&mut self) -> Result<u8, Self::Error>;
}

impl<I2C: I2c<SevenBitAddress>> KeyEventSource for Tca8418<I2C> {
    type Error = I2C::Error;

    async fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
        Tca8418::read_register(self, register).await
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        Tca8418::write_register(self, register, value).await
    }

    async fn available(&mut self) -> Result<bool, Self::Error> {
        Tca8418::available(self).await
    }

    async fn next_event(&mut self) -> Result<u8, Self::Error> {
        Tca8418::next_event(self).await
    }
}

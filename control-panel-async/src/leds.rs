//! Indicator feedback across the two LED strips.
//!
//! Pixel writes only touch the in-memory frames. Nothing reaches the strips
//! until [`LedFeedback::flush`], which sends both frames in one go.

use log::warn;
use smart_leds::{brightness, SmartLedsWrite, RGB8};

use crate::binding::{BindingTable, LedBinding, Strip, BOTTOM_PIXELS, TOP_PIXELS};
use crate::config::PanelConfig;

/// Owns both strip drivers and their frame buffers.
pub struct LedFeedback<T, B> {
    top: T,
    bottom: B,
    top_frame: [RGB8; TOP_PIXELS],
    bottom_frame: [RGB8; BOTTOM_PIXELS],
    brightness: u8,
    idle_color: RGB8,
    active_color: RGB8,
}

impl<T, B> LedFeedback<T, B>
where
    T: SmartLedsWrite,
    T::Color: From<RGB8>,
    T::Error: core::fmt::Debug,
    B: SmartLedsWrite,
    B::Color: From<RGB8>,
    B::Error: core::fmt::Debug,
{
    /// Creates the controller with dark frames.
    pub fn new(top: T, bottom: B, config: &PanelConfig) -> Self {
        Self {
            top,
            bottom,
            top_frame: [RGB8::default(); TOP_PIXELS],
            bottom_frame: [RGB8::default(); BOTTOM_PIXELS],
            brightness: config.brightness,
            idle_color: config.idle_color,
            active_color: config.active_color,
        }
    }

    /// Sets the global brightness applied on the next flush.
    pub fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    /// Paints a binding with the idle color.
    pub fn set_idle(&mut self, binding: &LedBinding) {
        self.paint(binding, self.idle_color);
    }

    /// Paints a binding with the active color.
    pub fn set_active(&mut self, binding: &LedBinding) {
        self.paint(binding, self.active_color);
    }

    /// Paints a binding with an arbitrary color. Unlit bindings are ignored.
    pub fn paint(&mut self, binding: &LedBinding, color: RGB8) {
        let Some(pixel) = binding.pixel else {
            return;
        };
        match self.frame_mut(binding.strip).get_mut(pixel as usize) {
            Some(slot) => *slot = color,
            None => warn!("Pixel {pixel} is past the end of the {:?} strip", binding.strip),
        }
    }

    /// Current frame content of one pixel.
    pub fn pixel(&self, strip: Strip, index: usize) -> Option<RGB8> {
        match strip {
            Strip::Top => self.top_frame.get(index).copied(),
            Strip::Bottom => self.bottom_frame.get(index).copied(),
        }
    }

    /// Paints every bound pixel idle and pushes the result with a single flush.
    pub fn show_idle(&mut self, bindings: &BindingTable) -> Result<(), ()> {
        for button in bindings.buttons() {
            self.set_idle(&button.led);
        }
        self.flush()
    }

    /// Sends both frames to the strips.
    ///
    /// The bottom strip is still written when the top one fails.
    pub fn flush(&mut self) -> Result<(), ()> {
        let top = self
            .top
            .write(brightness(self.top_frame.iter().copied(), self.brightness))
            .map_err(|err| warn!("Top strip write failed: {err:?}"));
        let bottom = self
            .bottom
            .write(brightness(self.bottom_frame.iter().copied(), self.brightness))
            .map_err(|err| warn!("Bottom strip write failed: {err:?}"));
        top.and(bottom)
    }

    fn frame_mut(&mut self, strip: Strip) -> &mut [RGB8] {
        match strip {
            Strip::Top => &mut self.top_frame,
            Strip::Bottom => &mut self.bottom_frame,
        }
    }

    #[cfg(test)]
    pub(crate) fn strips(&self) -> (&T, &B) {
        (&self.top, &self.bottom)
    }
}

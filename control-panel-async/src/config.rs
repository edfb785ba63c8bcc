//! Tunables for the control loop.

use embassy_time::Duration;
use smart_leds::RGB8;

/// Amber, shown on every bound button at rest.
pub const IDLE_COLOR: RGB8 = RGB8 { r: 255, g: 160, b: 0 };
/// Cyan, shown while a button is held.
pub const ACTIVE_COLOR: RGB8 = RGB8 { r: 0, g: 255, b: 255 };

/// Configuration for the panel controller.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// How long a local matrix sample must hold before it is accepted.
    pub debounce: Duration,
    /// Settle time between driving a row low and sampling the columns, in microseconds.
    pub row_settle_us: u32,
    /// Pause between two control cycles.
    pub cycle_interval: Duration,
    /// Pause between acknowledging the reboot command and rebooting.
    pub reboot_settle: Duration,
    /// Global strip brightness (0-255).
    pub brightness: u8,
    /// Color of a released button.
    pub idle_color: RGB8,
    /// Color of a pressed button.
    pub active_color: RGB8,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(20),
            row_settle_us: 60,
            cycle_interval: Duration::from_millis(5),
            reboot_settle: Duration::from_millis(100),
            brightness: 128,
            idle_color: IDLE_COLOR,
            active_color: ACTIVE_COLOR,
        }
    }
}

//! The control loop: poll the expander, scan the local matrix, drive the LEDs
//! and watch the admin channel.

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io::{Read, ReadReady};
use heapless::Vec;
use log::{debug, info};
use smart_leds::{SmartLedsWrite, RGB8};
use tca8418_async::{reg, FIFO_DEPTH, INT_STAT_GPI_INT, INT_STAT_K_INT};

use crate::admin::{AdminChannel, AdminCommand, Bootloader};
use crate::binding::{BindingTable, LOCAL_COLS, LOCAL_KEYS, LOCAL_ROWS};
use crate::config::PanelConfig;
use crate::debounce::Debouncer;
use crate::expander::KeyEventSource;
use crate::keycode::{KeyEvent, KeySource};
use crate::leds::LedFeedback;
use crate::matrix::LocalMatrix;
use crate::report::Report;

/// Most reports a single cycle can produce: a full expander queue plus every
/// local key changing at once.
pub const MAX_REPORTS: usize = FIFO_DEPTH + LOCAL_KEYS;

/// What one control cycle did.
#[derive(Debug, Default)]
pub struct Cycle {
    /// Button reports, in the order they were logged.
    pub reports: Vec<Report<'static>, MAX_REPORTS>,
    /// Number of strip flushes issued.
    pub flushes: u8,
}

impl Cycle {
    fn report(&mut self, report: Report<'static>) {
        info!("{report}");
        if self.reports.push(report).is_err() {
            debug!("Cycle report buffer full");
        }
    }

    fn flush<T, B>(&mut self, leds: &mut LedFeedback<T, B>)
    where
        T: SmartLedsWrite,
        T::Color: From<RGB8>,
        T::Error: core::fmt::Debug,
        B: SmartLedsWrite,
        B::Color: From<RGB8>,
        B::Error: core::fmt::Debug,
    {
        leds.flush().ok();
        self.flushes = self.flushes.saturating_add(1);
    }
}

/// The whole panel: both matrices, the debounce state, the LED frames and the
/// binding tables.
///
/// Without an expander the panel keeps serving the local matrix.
pub struct Panel<K, T, B, O, I> {
    expander: Option<K>,
    matrix: LocalMatrix<O, I, LOCAL_ROWS, LOCAL_COLS>,
    debouncer: Debouncer<LOCAL_ROWS, LOCAL_COLS>,
    leds: LedFeedback<T, B>,
    bindings: BindingTable,
    config: PanelConfig,
}

impl<K, T, B, O, I> Panel<K, T, B, O, I>
where
    K: KeyEventSource,
    T: SmartLedsWrite,
    T::Color: From<RGB8>,
    T::Error: core::fmt::Debug,
    B: SmartLedsWrite,
    B::Color: From<RGB8>,
    B::Error: core::fmt::Debug,
    O: OutputPin,
    I: InputPin,
{
    /// Assembles the panel. Call [`Panel::init`] before the first cycle.
    ///
    /// # Arguments
    ///
    /// * `expander` - The keypad expander, `None` if it failed to come up.
    /// * `matrix` - The directly wired 5x2 matrix.
    /// * `leds` - Feedback on the two strips.
    /// * `bindings` - Button tables for both matrices.
    /// * `config` - Timing and color settings.
    pub fn new(
        expander: Option<K>,
        matrix: LocalMatrix<O, I, LOCAL_ROWS, LOCAL_COLS>,
        leds: LedFeedback<T, B>,
        bindings: BindingTable,
        config: PanelConfig,
    ) -> Self {
        Self {
            expander,
            matrix,
            debouncer: Debouncer::new(config.debounce),
            leds,
            bindings,
            config,
        }
    }

    /// Applies the brightness and lights every bound button idle with one flush.
    ///
    /// A missing expander is reported by whoever failed to bring it up.
    pub fn init(&mut self) -> Result<(), ()> {
        self.leds.set_brightness(self.config.brightness);
        self.leds.show_idle(&self.bindings)
    }

    /// `true` when the expander is attached.
    pub fn has_expander(&self) -> bool {
        self.expander.is_some()
    }

    /// LED feedback, for inspection.
    pub fn leds(&self) -> &LedFeedback<T, B> {
        &self.leds
    }

    /// Runs one control cycle at `now`.
    ///
    /// Expander events are batched into a single flush at the end of the cycle.
    /// Local events flush as soon as they are debounced.
    pub async fn cycle<D: DelayNs>(&mut self, now: Instant, delay: &mut D) -> Cycle {
        let mut cycle = Cycle::default();

        let flush_owed = self.poll_expander(&mut cycle).await;
        self.scan_local(now, delay, &mut cycle).await;

        if flush_owed {
            cycle.flush(&mut self.leds);
        }
        cycle
    }

    /// Cycles forever, rebooting into the bootloader when the admin channel asks for it.
    pub async fn run<R, L, D>(
        mut self,
        admin: &mut AdminChannel<R>,
        bootloader: &mut L,
        mut delay: D,
    ) -> !
    where
        R: Read + ReadReady,
        L: Bootloader,
        D: DelayNs,
    {
        loop {
            self.cycle(Instant::now(), &mut delay).await;

            if let Some(AdminCommand::Boot) = admin.poll() {
                info!("Rebooting to bootloader...");
                delay.delay_us(micros(self.config.reboot_settle)).await;
                bootloader.reboot_to_bootloader();
            }

            delay.delay_us(micros(self.config.cycle_interval)).await;
        }
    }

    /// Acknowledges GPI interrupts and drains the key event queue.
    ///
    /// Returns `true` when a pixel changed and a flush is owed.
    async fn poll_expander(&mut self, cycle: &mut Cycle) -> bool {
        let Self {
            expander,
            leds,
            bindings,
            ..
        } = self;
        let Some(expander) = expander.as_mut() else {
            return false;
        };

        let status = match expander.read_register(reg::INT_STAT).await {
            Ok(status) => status,
            Err(err) => {
                debug!("Reading INT_STAT failed: {err:?}");
                return false;
            }
        };

        if status & INT_STAT_GPI_INT != 0 {
            for register in [
                reg::GPIO_INT_STAT_1,
                reg::GPIO_INT_STAT_2,
                reg::GPIO_INT_STAT_3,
            ] {
                expander
                    .read_register(register)
                    .await
                    .map_err(|err| debug!("Reading GPIO_INT_STAT {register:#04x} failed: {err:?}"))
                    .ok();
            }
            expander
                .write_register(reg::INT_STAT, INT_STAT_GPI_INT)
                .await
                .map_err(|err| debug!("Clearing GPI interrupt failed: {err:?}"))
                .ok();
        }

        let mut flush_owed = false;
        if status & INT_STAT_K_INT != 0 {
            for _ in 0..FIFO_DEPTH {
                if !expander.available().await.unwrap_or(false) {
                    break;
                }
                let code = match expander.next_event().await {
                    Ok(code) => code,
                    Err(err) => {
                        debug!("Reading key event failed: {err:?}");
                        break;
                    }
                };
                let Some(event) = KeyEvent::decode(code) else {
                    break;
                };
                flush_owed |= route_expander_event(leds, bindings, event, cycle);
            }
            expander
                .write_register(reg::INT_STAT, INT_STAT_K_INT)
                .await
                .map_err(|err| debug!("Clearing key interrupt failed: {err:?}"))
                .ok();
        }

        flush_owed
    }

    async fn scan_local<D: DelayNs>(&mut self, now: Instant, delay: &mut D, cycle: &mut Cycle) {
        let raw = self.matrix.scan(delay).await;

        let Self {
            debouncer,
            leds,
            bindings,
            ..
        } = self;
        debouncer.update(&raw, now, |event| {
            let Some(button) = bindings.local(event.row, event.column) else {
                cycle.report(Report::Unmapped {
                    pressed: event.pressed,
                    row: event.row,
                    column: event.column,
                });
                return;
            };

            cycle.report(Report::Button {
                pressed: event.pressed,
                name: button.name,
                row: event.row,
                column: event.column,
            });
            if event.pressed {
                leds.set_active(&button.led);
            } else {
                leds.set_idle(&button.led);
            }
            cycle.flush(leds);
        });
    }
}

/// Whole microseconds of `duration`, saturating at `u32::MAX` (about 71 minutes).
fn micros(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}

fn route_expander_event<T, B>(
    leds: &mut LedFeedback<T, B>,
    bindings: &BindingTable,
    event: KeyEvent,
    cycle: &mut Cycle,
) -> bool
where
    T: SmartLedsWrite,
    T::Color: From<RGB8>,
    T::Error: core::fmt::Debug,
    B: SmartLedsWrite,
    B::Color: From<RGB8>,
    B::Error: core::fmt::Debug,
{
    let pressed = event.pressed;
    match event.source {
        KeySource::Gpi { pin } => {
            cycle.report(Report::Gpio { pressed, pin });
            false
        }
        KeySource::Matrix { row, column } => match bindings.expander(row, column) {
            Some(button) => {
                cycle.report(Report::Button {
                    pressed,
                    name: button.name,
                    row,
                    column,
                });
                if pressed {
                    leds.set_active(&button.led);
                } else {
                    leds.set_idle(&button.led);
                }
                true
            }
            None => {
                cycle.report(Report::Unmapped {
                    pressed,
                    row,
                    column,
                });
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::admin::tests::FakePort;
    use crate::binding::Strip;
    use crate::config::{ACTIVE_COLOR, IDLE_COLOR};
    use crate::leds::tests::RecordingStrip;
    use crate::matrix::tests::{wired_matrix, ColumnPin, NoDelay, RowPin, Wiring};
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec as StdVec;

    /// Register file of the expander: INT_STAT is write-1-to-clear, the key
    /// queue is popped by `next_event`.
    #[derive(Default)]
    struct FakeExpander {
        int_stat: u8,
        queue: VecDeque<u8>,
        reads: StdVec<u8>,
        writes: StdVec<(u8, u8)>,
    }

    impl FakeExpander {
        fn with_keys(codes: &[u8]) -> Self {
            Self {
                int_stat: INT_STAT_K_INT,
                queue: codes.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl KeyEventSource for FakeExpander {
        type Error = Infallible;

        async fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
            self.reads.push(register);
            Ok(if register == reg::INT_STAT {
                self.int_stat
            } else {
                0
            })
        }

        async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
            self.writes.push((register, value));
            if register == reg::INT_STAT {
                self.int_stat &= !value;
            }
            Ok(())
        }

        async fn available(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.queue.is_empty())
        }

        async fn next_event(&mut self) -> Result<u8, Self::Error> {
            Ok(self.queue.pop_front().unwrap_or(0))
        }
    }

    type TestPanel = Panel<FakeExpander, RecordingStrip, RecordingStrip, RowPin, ColumnPin>;

    fn panel(expander: Option<FakeExpander>, wiring: &Rc<Wiring>) -> TestPanel {
        let config = PanelConfig {
            brightness: 255,
            ..PanelConfig::default()
        };
        let leds = LedFeedback::new(
            RecordingStrip::default(),
            RecordingStrip::default(),
            &config,
        );
        let mut panel = Panel::new(
            expander,
            wired_matrix(wiring),
            leds,
            BindingTable::new(),
            config,
        );
        panel.init().unwrap();
        panel
    }

    fn frames(panel: &TestPanel) -> (usize, usize) {
        let (top, bottom) = panel.leds().strips();
        (top.frames.len(), bottom.frames.len())
    }

    /// Packed press/release byte for an expander position.
    fn code(pressed: bool, row: u8, column: u8) -> u8 {
        let key = row * 10 + column + 1;
        if pressed {
            0x80 | key
        } else {
            key
        }
    }

    fn expander(panel: &TestPanel) -> &FakeExpander {
        panel.expander.as_ref().unwrap()
    }

    #[test]
    fn startup_shows_idle_with_a_single_flush() {
        let wiring = Rc::new(Wiring::default());
        let panel = panel(Some(FakeExpander::default()), &wiring);
        assert_eq!(frames(&panel), (1, 1));
        assert_eq!(panel.leds().pixel(Strip::Top, 3), Some(IDLE_COLOR));
        assert_eq!(panel.leds().pixel(Strip::Bottom, 44), Some(IDLE_COLOR));
    }

    #[test]
    fn expander_events_share_one_flush() {
        let wiring = Rc::new(Wiring::default());
        let keys = [code(true, 3, 6), code(true, 3, 8), code(false, 3, 6)];
        let mut panel = panel(Some(FakeExpander::with_keys(&keys)), &wiring);

        let cycle = block_on(panel.cycle(Instant::from_millis(0), &mut NoDelay::default()));

        assert_eq!(cycle.flushes, 1);
        assert_eq!(frames(&panel), (2, 2));
        assert_eq!(
            cycle.reports.as_slice(),
            &[
                Report::Button { pressed: true, name: "T_ROW5", row: 3, column: 6 },
                Report::Button { pressed: true, name: "B_ROW5", row: 3, column: 8 },
                Report::Button { pressed: false, name: "T_ROW5", row: 3, column: 6 },
            ]
        );
        assert_eq!(panel.leds().pixel(Strip::Bottom, 0), Some(IDLE_COLOR));
        assert_eq!(panel.leds().pixel(Strip::Bottom, 23), Some(ACTIVE_COLOR));
        let (_, bottom) = panel.leds().strips();
        assert_eq!(bottom.frames[1][23], ACTIVE_COLOR);

        let expander = expander(&panel);
        assert_eq!(expander.int_stat, 0);
        assert!(expander.queue.is_empty());
    }

    #[test]
    fn unmapped_position_is_reported_without_flush() {
        let wiring = Rc::new(Wiring::default());
        let mut panel = panel(Some(FakeExpander::with_keys(&[code(true, 0, 9)])), &wiring);

        let cycle = block_on(panel.cycle(Instant::from_millis(0), &mut NoDelay::default()));

        assert_eq!(
            cycle.reports.as_slice(),
            &[Report::Unmapped { pressed: true, row: 0, column: 9 }]
        );
        assert_eq!(cycle.flushes, 0);
        assert_eq!(frames(&panel), (1, 1));
    }

    #[test]
    fn gpi_interrupt_is_acknowledged_and_reported() {
        let wiring = Rc::new(Wiring::default());
        let mut chip = FakeExpander::with_keys(&[0xE5]);
        chip.int_stat |= INT_STAT_GPI_INT;
        let mut panel = panel(Some(chip), &wiring);

        let cycle = block_on(panel.cycle(Instant::from_millis(0), &mut NoDelay::default()));

        assert_eq!(
            cycle.reports.as_slice(),
            &[Report::Gpio { pressed: true, pin: 4 }]
        );
        assert_eq!(cycle.flushes, 0);

        let expander = expander(&panel);
        assert_eq!(
            expander.reads,
            [
                reg::INT_STAT,
                reg::GPIO_INT_STAT_1,
                reg::GPIO_INT_STAT_2,
                reg::GPIO_INT_STAT_3,
            ]
        );
        assert_eq!(
            expander.writes,
            [
                (reg::INT_STAT, INT_STAT_GPI_INT),
                (reg::INT_STAT, INT_STAT_K_INT),
            ]
        );
        assert_eq!(expander.int_stat, 0);
    }

    #[test]
    fn queue_is_left_alone_without_key_interrupt() {
        let wiring = Rc::new(Wiring::default());
        let mut chip = FakeExpander::with_keys(&[code(true, 0, 0)]);
        chip.int_stat = 0;
        let mut panel = panel(Some(chip), &wiring);

        let cycle = block_on(panel.cycle(Instant::from_millis(0), &mut NoDelay::default()));

        assert!(cycle.reports.is_empty());
        assert_eq!(expander(&panel).queue.len(), 1);
        assert!(expander(&panel).writes.is_empty());
    }

    #[test]
    fn draining_stops_at_queue_depth() {
        let wiring = Rc::new(Wiring::default());
        let keys = [code(true, 0, 9); FIFO_DEPTH + 2];
        let mut panel = panel(Some(FakeExpander::with_keys(&keys)), &wiring);

        let cycle = block_on(panel.cycle(Instant::from_millis(0), &mut NoDelay::default()));

        assert_eq!(cycle.reports.len(), FIFO_DEPTH);
        assert_eq!(expander(&panel).queue.len(), 2);
    }

    #[test]
    fn local_matrix_works_without_expander() {
        let wiring = Rc::new(Wiring::default());
        let mut panel = panel(None, &wiring);
        assert!(!panel.has_expander());
        assert_eq!(frames(&panel), (1, 1));

        let mut closed = [[false; 2]; 5];
        closed[0][0] = true;
        wiring.closed.set(closed);

        let mut delay = NoDelay::default();
        let first = block_on(panel.cycle(Instant::from_millis(0), &mut delay));
        assert!(first.reports.is_empty());

        let settled = block_on(panel.cycle(Instant::from_millis(20), &mut delay));
        assert_eq!(
            settled.reports.as_slice(),
            &[Report::Button { pressed: true, name: "HORN", row: 0, column: 0 }]
        );
        assert_eq!(settled.flushes, 1);
        assert_eq!(panel.leds().pixel(Strip::Top, 3), Some(ACTIVE_COLOR));
        assert_eq!(panel.leds().strips().0.frames[1][3], ACTIVE_COLOR);

        wiring.closed.set([[false; 2]; 5]);
        block_on(panel.cycle(Instant::from_millis(25), &mut delay));
        let released = block_on(panel.cycle(Instant::from_millis(45), &mut delay));
        assert!(!released.reports[0].pressed());
        assert_eq!(panel.leds().pixel(Strip::Top, 3), Some(IDLE_COLOR));
    }

    #[test]
    fn local_events_flush_one_by_one() {
        let wiring = Rc::new(Wiring::default());
        let mut panel = panel(Some(FakeExpander::default()), &wiring);

        let mut closed = [[false; 2]; 5];
        closed[1][0] = true;
        closed[4][1] = true;
        wiring.closed.set(closed);

        let mut delay = NoDelay::default();
        block_on(panel.cycle(Instant::from_millis(0), &mut delay));
        let cycle = block_on(panel.cycle(Instant::from_millis(30), &mut delay));

        assert_eq!(cycle.reports.len(), 2);
        assert_eq!(cycle.flushes, 2);
        assert_eq!(frames(&panel), (3, 3));
    }

    #[test]
    fn short_local_blip_never_reaches_the_leds() {
        let wiring = Rc::new(Wiring::default());
        let mut panel = panel(None, &wiring);

        let mut closed = [[false; 2]; 5];
        closed[2][1] = true;
        let mut delay = NoDelay::default();
        wiring.closed.set(closed);
        block_on(panel.cycle(Instant::from_millis(0), &mut delay));
        wiring.closed.set([[false; 2]; 5]);
        let cycle = block_on(panel.cycle(Instant::from_millis(10), &mut delay));

        assert!(cycle.reports.is_empty());
        assert_eq!(frames(&panel), (1, 1));
    }

    #[test]
    fn local_flushes_come_before_the_deferred_expander_flush() {
        let wiring = Rc::new(Wiring::default());
        let mut panel = panel(Some(FakeExpander::default()), &wiring);

        let mut closed = [[false; 2]; 5];
        closed[0][0] = true;
        wiring.closed.set(closed);
        let mut delay = NoDelay::default();
        block_on(panel.cycle(Instant::from_millis(0), &mut delay));

        // T_ROW5 is pressed and released within the batch, B_ROW5 stays held.
        let chip = panel.expander.as_mut().unwrap();
        chip.int_stat = INT_STAT_K_INT;
        chip.queue
            .extend([code(true, 3, 6), code(true, 3, 8), code(false, 3, 6)]);

        let cycle = block_on(panel.cycle(Instant::from_millis(20), &mut delay));

        assert_eq!(cycle.flushes, 2);
        assert_eq!(cycle.reports.len(), 4);
        assert!(matches!(cycle.reports[0], Report::Button { name: "T_ROW5", .. }));
        assert!(matches!(
            cycle.reports[3],
            Report::Button { name: "HORN", pressed: true, .. }
        ));

        let (top, bottom) = panel.leds().strips();
        assert_eq!(frames(&panel), (3, 3));
        // The local flush already carries the expander's paint, last write first.
        assert_eq!(top.frames[1][3], ACTIVE_COLOR);
        assert_eq!(bottom.frames[1][0], IDLE_COLOR);
        assert_eq!(bottom.frames[1][23], ACTIVE_COLOR);
        assert_eq!(bottom.frames[2], bottom.frames[1]);
    }

    #[test]
    fn long_delays_saturate_instead_of_wrapping() {
        assert_eq!(micros(Duration::from_millis(5)), 5_000);
        assert_eq!(micros(Duration::from_secs(4_295)), u32::MAX);
        assert_eq!(micros(Duration::from_secs(3 * 3_600)), u32::MAX);
    }

    struct PanickingBootloader;

    impl Bootloader for PanickingBootloader {
        fn reboot_to_bootloader(&mut self) -> ! {
            panic!("rebooted");
        }
    }

    #[test]
    #[should_panic(expected = "rebooted")]
    fn boot_command_reboots() {
        let wiring = Rc::new(Wiring::default());
        let panel = panel(None, &wiring);
        let mut admin = AdminChannel::new(FakePort::with(b"BOOT\n"));
        block_on(panel.run(&mut admin, &mut PanickingBootloader, NoDelay::default()));
    }
}

//! Per-key debounce logic for the software-scanned matrix.
//!
//! Each key remembers its last raw reading and when that reading last changed.
//! A new level is only accepted once the raw reading has held for the whole
//! debounce window, so contact chatter keeps restarting the window and never
//! reaches the stable state.

use embassy_time::{Duration, Instant};

/// Debounce bookkeeping for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceState {
    /// Accepted level, `true` while pressed.
    pub stable: bool,
    /// Accepted level before the last commit.
    pub previous_stable: bool,
    /// Most recent raw sample.
    pub reading: bool,
    /// When `reading` last flipped.
    pub last_change: Instant,
}

impl DebounceState {
    const IDLE: Self = Self {
        stable: false,
        previous_stable: false,
        reading: false,
        last_change: Instant::from_ticks(0),
    };
}

/// A committed press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceEvent {
    /// Matrix row.
    pub row: u8,
    /// Matrix column.
    pub column: u8,
    /// `true` for a press, `false` for a release.
    pub pressed: bool,
}

/// Time-based debouncer for a `ROWS` x `COLS` matrix.
pub struct Debouncer<const ROWS: usize, const COLS: usize> {
    states: [[DebounceState; COLS]; ROWS],
    window: Duration,
}

impl<const ROWS: usize, const COLS: usize> Debouncer<ROWS, COLS> {
    /// Creates a debouncer with every key released.
    pub const fn new(window: Duration) -> Self {
        Self {
            states: [[DebounceState::IDLE; COLS]; ROWS],
            window,
        }
    }

    /// Bookkeeping for one key.
    pub fn state(&self, row: usize, column: usize) -> &DebounceState {
        &self.states[row][column]
    }

    /// Feeds one raw scan taken at `now`, where `true` means the key reads pressed.
    ///
    /// `on_event` is called once for every key whose stable level changed.
    pub fn update(
        &mut self,
        raw: &[[bool; COLS]; ROWS],
        now: Instant,
        mut on_event: impl FnMut(DebounceEvent),
    ) {
        for (row, (states, samples)) in self.states.iter_mut().zip(raw.iter()).enumerate() {
            for (column, (key, &sample)) in states.iter_mut().zip(samples.iter()).enumerate() {
                if sample != key.reading {
                    key.reading = sample;
                    key.last_change = now;
                    continue;
                }

                let settled = now.saturating_duration_since(key.last_change) >= self.window;
                if settled && key.stable != key.reading {
                    key.previous_stable = key.stable;
                    key.stable = key.reading;
                    if key.stable != key.previous_stable {
                        on_event(DebounceEvent {
                            row: row as u8,
                            column: column as u8,
                            pressed: key.stable,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    const WINDOW: Duration = Duration::from_millis(20);

    fn grid(pressed: Option<(usize, usize)>) -> [[bool; 2]; 5] {
        let mut raw = [[false; 2]; 5];
        if let Some((row, column)) = pressed {
            raw[row][column] = true;
        }
        raw
    }

    fn feed(debouncer: &mut Debouncer<5, 2>, raw: &[[bool; 2]; 5], ms: u64) -> Vec<DebounceEvent> {
        let mut events = Vec::new();
        debouncer.update(raw, Instant::from_millis(ms), |event| events.push(event));
        events
    }

    #[test]
    fn starts_released() {
        let debouncer = Debouncer::<5, 2>::new(WINDOW);
        for row in 0..5 {
            for column in 0..2 {
                assert_eq!(*debouncer.state(row, column), DebounceState::IDLE);
            }
        }
    }

    #[test]
    fn sample_held_shorter_than_window_never_commits() {
        let mut debouncer = Debouncer::<5, 2>::new(WINDOW);
        let pressed = grid(Some((2, 1)));

        for ms in 100..120 {
            assert!(feed(&mut debouncer, &pressed, ms).is_empty());
        }
        assert!(!debouncer.state(2, 1).stable);

        // Released again before the window closed.
        assert!(feed(&mut debouncer, &grid(None), 119).is_empty());
        assert!(feed(&mut debouncer, &grid(None), 200).is_empty());
        assert!(!debouncer.state(2, 1).stable);
    }

    #[test]
    fn sample_held_for_window_commits_exactly_once() {
        let mut debouncer = Debouncer::<5, 2>::new(WINDOW);
        let pressed = grid(Some((0, 1)));

        assert!(feed(&mut debouncer, &pressed, 100).is_empty());
        assert!(feed(&mut debouncer, &pressed, 110).is_empty());
        let events = feed(&mut debouncer, &pressed, 120);
        assert_eq!(
            events,
            [DebounceEvent { row: 0, column: 1, pressed: true }]
        );

        let state = debouncer.state(0, 1);
        assert!(state.stable);
        assert!(!state.previous_stable);

        for ms in 121..200 {
            assert!(feed(&mut debouncer, &pressed, ms).is_empty());
        }
    }

    #[test]
    fn release_is_debounced_the_same_way() {
        let mut debouncer = Debouncer::<5, 2>::new(WINDOW);
        let pressed = grid(Some((4, 0)));
        feed(&mut debouncer, &pressed, 0);
        assert_eq!(feed(&mut debouncer, &pressed, 20).len(), 1);

        let released = grid(None);
        assert!(feed(&mut debouncer, &released, 30).is_empty());
        assert!(feed(&mut debouncer, &released, 45).is_empty());
        assert_eq!(
            feed(&mut debouncer, &released, 50),
            [DebounceEvent { row: 4, column: 0, pressed: false }]
        );
        assert!(debouncer.state(4, 0).previous_stable);
    }

    #[test]
    fn chatter_keeps_restarting_the_window() {
        let mut debouncer = Debouncer::<5, 2>::new(WINDOW);
        let pressed = grid(Some((1, 0)));
        let released = grid(None);

        for step in 0..50u64 {
            let raw = if step % 2 == 0 { &pressed } else { &released };
            assert!(feed(&mut debouncer, raw, step * 15).is_empty());
        }
        assert!(!debouncer.state(1, 0).stable);
    }

    #[test]
    fn keys_are_independent() {
        let mut debouncer = Debouncer::<5, 2>::new(WINDOW);
        let mut both = [[false; 2]; 5];
        both[0][0] = true;
        both[3][1] = true;

        feed(&mut debouncer, &both, 0);
        let events = feed(&mut debouncer, &both, 25);
        assert_eq!(
            events,
            [
                DebounceEvent { row: 0, column: 0, pressed: true },
                DebounceEvent { row: 3, column: 1, pressed: true },
            ]
        );
    }
}

use std::time::Duration;

/// Poll interval state for one listener.
///
/// With dynamic polling off the interval is always `base`. With it on, every
/// empty tick multiplies the interval by 1.5 up to `max`, and any tick with
/// new messages snaps it back to `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    base: Duration,
    max: Duration,
    current: Duration,
    dynamic: bool,
}

impl Pacer {
    pub fn new(base: Duration, max: Duration, dynamic: bool) -> Self {
        Self {
            base,
            max: max.max(base),
            current: base,
            dynamic,
        }
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Switches mode and resets the interval to `base`.
    pub fn set_dynamic(&mut self, enabled: bool) {
        self.dynamic = enabled;
        self.current = self.base;
    }

    /// Recomputes the interval after a tick that found `new_messages`.
    pub fn record(&mut self, new_messages: usize) -> Duration {
        self.current = if !self.dynamic || new_messages > 0 {
            self.base
        } else {
            (self.current * 3 / 2).min(self.max)
        };
        self.current
    }
}

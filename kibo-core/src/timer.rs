//! Periodic interval timer driven by a millisecond clock.

pub struct Cooldown {
    interval: u32,
    last: u32,
}

impl Cooldown {
    /// An interval of 0 never fires.
    pub const fn new(interval: u32) -> Self {
        Self { interval, last: 0 }
    }

    pub fn set_interval(&mut self, interval: u32) {
        self.interval = interval;
    }

    /// True at most once per elapsed interval. The deadline advances by
    /// exactly one interval so firing does not drift with polling jitter.
    pub fn update(&mut self, now_ms: u32) -> bool {
        if self.interval == 0 {
            return false;
        }
        if now_ms.wrapping_sub(self.last) < self.interval {
            return false;
        }

        self.last = self.last.wrapping_add(self.interval);
        true
    }
}

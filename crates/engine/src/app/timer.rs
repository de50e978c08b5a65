/// Fixed-cadence repeating event driven by simulation ticks. Fires at most
/// `repeats` times; a cancelled timer never fires again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatingTimer {
    interval_seconds: f32,
    elapsed_seconds: f32,
    remaining: u32,
}

impl RepeatingTimer {
    pub fn new(interval_seconds: f32, repeats: u32) -> Self {
        Self {
            interval_seconds,
            elapsed_seconds: 0.0,
            remaining: repeats,
        }
    }

    /// Advances the timer and returns how many times it fired during this tick.
    pub fn tick(&mut self, dt_seconds: f32) -> u32 {
        if self.remaining == 0 {
            return 0;
        }
        if !self.interval_seconds.is_finite() || self.interval_seconds <= 0.0 {
            let fired = self.remaining;
            self.remaining = 0;
            return fired;
        }

        self.elapsed_seconds += dt_seconds.max(0.0);
        let mut fired = 0;
        while self.remaining > 0 && self.elapsed_seconds >= self.interval_seconds {
            self.elapsed_seconds -= self.interval_seconds;
            self.remaining -= 1;
            fired += 1;
        }
        fired
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// One-shot countdown used for fades and toast lifetimes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    duration_seconds: f32,
    remaining_seconds: f32,
    completed: bool,
}

impl Countdown {
    pub fn new(duration_seconds: f32) -> Self {
        let duration_seconds = if duration_seconds.is_finite() {
            duration_seconds.max(0.0)
        } else {
            0.0
        };
        Self {
            duration_seconds,
            remaining_seconds: duration_seconds,
            completed: false,
        }
    }

    /// Returns true exactly once, on the tick the countdown reaches zero.
    pub fn tick(&mut self, dt_seconds: f32) -> bool {
        if self.completed {
            return false;
        }
        self.remaining_seconds -= dt_seconds.max(0.0);
        if self.remaining_seconds <= 0.0 {
            self.remaining_seconds = 0.0;
            self.completed = true;
            return true;
        }
        false
    }

    pub fn is_done(&self) -> bool {
        self.completed
    }

    /// 0.0 at start, 1.0 when done.
    pub fn progress(&self) -> f32 {
        if self.duration_seconds <= 0.0 {
            return 1.0;
        }
        1.0 - self.remaining_seconds / self.duration_seconds
    }
}

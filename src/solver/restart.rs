/// Geometric restart schedule.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Restart {
    counter: u64,
    interval: f64,
    growth: f64,
}

impl Restart {
    pub(crate) fn new(interval: u64, growth: f64) -> Self {
        // precision loss is irrelevant for conflict counts
        #[allow(clippy::cast_precision_loss)]
        let interval = interval as f64;
        Self { counter: 0, interval, growth }
    }

    /// Counts a conflict and returns `true` if a restart is due.
    pub(crate) fn should_do_restart(&mut self) -> bool {
        self.counter += 1;
        #[allow(clippy::cast_precision_loss)]
        if self.counter as f64 >= self.interval {
            self.counter = 0;
            self.interval *= self.growth;
            return true;
        }
        false
    }
}

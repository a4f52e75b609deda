use std::time::Duration;

type Sleeper = Box<dyn FnMut(Duration)>;

/// Fixed wait between listing pages.
///
/// Each roster page fans out into one report-index request per committee, so
/// the pause comes after the whole page has been processed.
pub struct PageThrottle {
    delay: Duration,
    sleeper: Sleeper,
    pauses: usize,
}

impl PageThrottle {
    pub fn new(delay: Duration) -> Self {
        Self::with_sleeper(delay, Box::new(std::thread::sleep))
    }

    /// Throttle with a custom sleep function, for tests and dry runs.
    pub fn with_sleeper(delay: Duration, sleeper: Sleeper) -> Self {
        Self {
            delay,
            sleeper,
            pauses: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Block for the configured delay. A zero delay returns immediately.
    pub fn pause(&mut self) {
        self.pauses += 1;
        if !self.delay.is_zero() {
            (self.sleeper)(self.delay);
        }
    }

    pub fn pauses(&self) -> usize {
        self.pauses
    }
}

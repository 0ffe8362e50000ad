use instant::Instant;

const EMA_ALPHA: f64 = 0.1;

/// Min/avg/max of the samples recorded since the last reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanWindow {
    pub samples: u32,
    pub min_us: f64,
    pub avg_us: f64,
    pub max_us: f64,
}

/// Wall-clock cost of a recurring piece of work, such as one simulation tick.
///
/// Keeps an EMA for the window title and a min/avg/max window for the
/// periodic stats log.
pub struct SpanTimer {
    ema_us: f64,
    sum_us: f64,
    min_us: f64,
    max_us: f64,
    samples: u32,
    start: Instant,
}

impl SpanTimer {
    pub fn new() -> Self {
        Self {
            ema_us: 0.0,
            sum_us: 0.0,
            min_us: f64::MAX,
            max_us: 0.0,
            samples: 0,
            start: Instant::now(),
        }
    }

    pub fn begin(&mut self) {
        self.start = Instant::now();
    }

    /// Record the time since `begin` and return it in microseconds.
    pub fn end(&mut self) -> f64 {
        let elapsed_us = self.start.elapsed().as_secs_f64() * 1_000_000.0;
        self.record(elapsed_us);
        elapsed_us
    }

    fn record(&mut self, us: f64) {
        self.ema_us = if self.samples == 0 && self.ema_us == 0.0 {
            us
        } else {
            self.ema_us * (1.0 - EMA_ALPHA) + us * EMA_ALPHA
        };
        self.sum_us += us;
        self.min_us = self.min_us.min(us);
        self.max_us = self.max_us.max(us);
        self.samples += 1;
    }

    /// Smoothed duration in microseconds.
    pub fn ema_us(&self) -> f64 {
        self.ema_us
    }

    /// Stats since the last reset, or `None` if nothing was recorded.
    pub fn window(&self) -> Option<SpanWindow> {
        (self.samples > 0).then(|| SpanWindow {
            samples: self.samples,
            min_us: self.min_us,
            avg_us: self.sum_us / self.samples as f64,
            max_us: self.max_us,
        })
    }

    /// Start a new stats window. The EMA carries over.
    pub fn reset_window(&mut self) {
        self.sum_us = 0.0;
        self.min_us = f64::MAX;
        self.max_us = 0.0;
        self.samples = 0;
    }
}

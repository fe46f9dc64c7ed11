/// Randomly selects a fraction of events.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    ratio: f64,
}

impl Sampler {
    /// Creates a sampler keeping `ratio` of the events, clamped to `0.0..=1.0`.
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    pub fn always() -> Self {
        Self::new(1.0)
    }

    pub fn never() -> Self {
        Self::new(0.0)
    }

    pub fn should_sample(&self) -> bool {
        if self.ratio >= 1.0 {
            return true;
        }
        if self.ratio <= 0.0 {
            return false;
        }

        rand::random::<f64>() < self.ratio
    }
}

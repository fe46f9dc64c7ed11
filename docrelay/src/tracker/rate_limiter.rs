use std::time::Instant;

/// Token bucket bounding the number of tracked events per second.
///
/// Tokens refill at a constant rate up to `max_tokens`, each event consumes one. A rate of
/// zero disables limiting.
#[derive(Debug)]
pub struct TokenBucket {
    max_tokens: u32,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_tokens: max_per_second,
            tokens: f64::from(max_per_second),
            last_refill: Instant::now(),
        }
    }

    /// Tries to consume one token, returning `true` if the event is allowed.
    pub fn try_acquire(&mut self) -> bool {
        if self.max_tokens == 0 {
            return true;
        }

        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens =
            (self.tokens + elapsed * f64::from(self.max_tokens)).min(f64::from(self.max_tokens));
        self.last_refill = now;
    }
}

//! Generation statistics tracking.
//!
//! The decode-side counterpart of the original instrumentation panels:
//! tokens generated, per-token latency, overall tokens/second.

use std::time::{Duration, Instant};

/// Tracks decode-phase performance for one generation call.
#[derive(Debug, Default)]
pub struct GenerationStats {
    decode_start: Option<Instant>,
    decode_tokens: usize,
    last_token_time: Option<Instant>,
}

impl GenerationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a generated token, returning the time since the previous one.
    pub fn record_token(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = self
            .last_token_time
            .or(self.decode_start)
            .map(|t| now.duration_since(t))
            .unwrap_or(Duration::ZERO);

        if self.decode_start.is_none() {
            self.decode_start = Some(now);
        }
        self.decode_tokens += 1;
        self.last_token_time = Some(now);
        elapsed
    }

    /// Decode throughput in tokens per second.
    pub fn decode_tps(&self) -> f64 {
        if let (Some(start), Some(last)) = (self.decode_start, self.last_token_time) {
            let secs = last.duration_since(start).as_secs_f64();
            if secs > 0.0 && self.decode_tokens > 1 {
                // Exclude the first token; its latency is dominated by prefill.
                return (self.decode_tokens - 1) as f64 / secs;
            }
        }
        0.0
    }

    pub fn tokens_generated(&self) -> usize {
        self.decode_tokens
    }

    /// One-line summary suitable for logging.
    pub fn summary_line(&self) -> String {
        format!(
            "decode: {} tok @ {:.1} t/s",
            self.decode_tokens,
            self.decode_tps()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_record_token_counts() {
        let mut stats = GenerationStats::new();
        assert_eq!(stats.tokens_generated(), 0);

        stats.record_token();
        stats.record_token();
        assert_eq!(stats.tokens_generated(), 2);
    }

    #[test]
    fn test_decode_tps_positive_after_two_tokens() {
        let mut stats = GenerationStats::new();

        stats.record_token();
        sleep(Duration::from_millis(20));
        let gap = stats.record_token();

        assert!(gap >= Duration::from_millis(20));
        assert!(stats.decode_tps() > 0.0);
    }

    #[test]
    fn test_single_token_has_no_throughput() {
        let mut stats = GenerationStats::new();
        stats.record_token();
        assert_eq!(stats.decode_tps(), 0.0);
    }
}

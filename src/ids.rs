//! Deterministic object ids.

/// Hands out ids that depend only on the seed, the attempt number and the
/// order of requests.
#[derive(Debug, Clone)]
pub struct IdSource {
    seed: u64,
    attempt: u32,
    counter: u64,
}

impl IdSource {
    pub fn new(seed: u64, attempt: u32) -> Self {
        Self {
            seed,
            attempt,
            counter: 0,
        }
    }

    /// `<prefix>_<12 hex digits>`
    pub fn next(&mut self, prefix: &str) -> String {
        self.counter += 1;
        let digest = md5::compute(format!(
            "{}:{}:{}:{}",
            self.seed, self.attempt, prefix, self.counter
        ));
        let hex = format!("{:x}", digest);
        format!("{}_{}", prefix, &hex[..12])
    }
}

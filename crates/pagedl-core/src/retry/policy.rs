use crate::config::RetryConfig;

/// Upper bound on submit attempts per submission chain.
///
/// Each resolver fix removes the condition that triggered it, so real chains
/// stay short; the cap stops a host that keeps rejecting rewritten requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 8 }
    }
}

impl RetryPolicy {
    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy { max_attempts: 3 };
        assert!(p.allows_retry_after(1));
        assert!(p.allows_retry_after(2));
        assert!(!p.allows_retry_after(3));
    }

    #[test]
    fn zero_attempts_in_config_still_allows_first_try() {
        let p = RetryPolicy::from(&RetryConfig { max_attempts: 0 });
        assert_eq!(p.max_attempts, 1);
        assert!(!p.allows_retry_after(1));
    }
}

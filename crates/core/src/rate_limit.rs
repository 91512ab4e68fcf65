//! Rate-limit advisory policy

use signage_domain::{RateLimitConfig, RateLimitSeverity};

/// Classify the `X-RateLimit-Remaining` value against the thresholds.
///
/// Returns `None` while the tenant is comfortably inside its budget.
pub const fn classify_remaining(
    remaining: u32,
    thresholds: &RateLimitConfig,
) -> Option<RateLimitSeverity> {
    if remaining < thresholds.critical_below {
        Some(RateLimitSeverity::Critical)
    } else if remaining < thresholds.warn_below {
        Some(RateLimitSeverity::Warning)
    } else {
        None
    }
}

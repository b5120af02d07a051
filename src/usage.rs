//! Provider-usage accounting.
//!
//! Every cache read and external call reports one [`UsageEvent`] so cost and
//! latency can be attributed per service, and so a cache hit is visibly
//! distinct from a paid call. Logging is fire-and-forget: implementations
//! must never block or fail the search that emitted the event.

use std::time::Duration;

/// One cache or provider interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub service: &'static str,
    pub cache_hit: bool,
    /// Notional cost of the call in USD; zero for cache hits.
    pub cost: f64,
    pub response_time_ms: u64,
    pub success: bool,
}

impl UsageEvent {
    /// A cost-free read served from a cache tier.
    pub fn cache_hit(service: &'static str) -> Self {
        Self {
            service,
            cache_hit: true,
            cost: 0.0,
            response_time_ms: 0,
            success: true,
        }
    }

    /// A real outbound call, successful or not.
    pub fn provider_call(service: &'static str, elapsed: Duration, success: bool, cost: f64) -> Self {
        Self {
            service,
            cache_hit: false,
            cost,
            response_time_ms: elapsed.as_millis() as u64,
            success,
        }
    }
}

pub trait UsageLogger: Send + Sync {
    fn log(&self, event: UsageEvent);
}

/// Default sink: one structured tracing event per interaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUsageLogger;

impl UsageLogger for TracingUsageLogger {
    fn log(&self, event: UsageEvent) {
        tracing::info!(
            service = event.service,
            cache_hit = event.cache_hit,
            cost = event.cost,
            response_time_ms = event.response_time_ms,
            success = event.success,
            "service_usage"
        );
    }
}

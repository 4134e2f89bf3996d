//! Reflex Metrics - Counters for store instrumentation
//!
//! Provides zero-cost named counters that completely vanish in
//! production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use reflex_metrics::Counter;
//!
//! let mut counter = Counter::new();
//! counter.increment("entities.created", 1);
//! println!("created: {}", counter.get("entities.created"));
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead and every read returns zero.

#[cfg(feature = "metrics")]
mod counter;

#[cfg(feature = "metrics")]
pub use counter::Counter;

/// Whether counters are compiled in.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: usize) {}
    pub fn set(&mut self, _name: &'static str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ { std::iter::empty() }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_with_either_feature_set() {
        let mut counter = super::Counter::new();
        counter.increment("ticks", 3);
        let expected = if super::ENABLED { 3 } else { 0 };
        assert_eq!(counter.get("ticks"), expected);
    }
}

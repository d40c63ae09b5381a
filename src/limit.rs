//! Withdrawal ceiling providers.

/// Supplies the current withdrawal ceiling.
pub trait LimitProvider: Send + Sync {
    /// Largest amount a single dispense may request. Always positive.
    fn current_limit(&self) -> u64;
}

/// A ceiling that never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLimit(pub u64);

impl LimitProvider for FixedLimit {
    fn current_limit(&self) -> u64 {
        self.0
    }
}

impl<F> LimitProvider for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn current_limit(&self) -> u64 {
        self()
    }
}

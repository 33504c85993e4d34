//! Statistics for the multicast bridge

/// Bridge-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Publishes that passed validation and got a context
    pub publishes_accepted: u64,
    /// Publishes rejected at admission
    pub publishes_rejected: u64,
    /// Live contexts force-closed by a republish of the same name
    pub replacements: u64,
    /// Contexts that reached `Republishing`
    pub republishing_started: u64,
    /// Group/stream construction, bind or attach failures
    pub setup_failures: u64,
    /// Unexpected session losses and group failures after setup
    pub transport_failures: u64,
    /// Contexts fully unregistered
    pub teardowns_completed: u64,
    /// Contexts unregistered without ever reaching `Republishing`
    pub failed_setups: u64,
    /// Contexts currently registered
    pub active_contexts: u64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }
}

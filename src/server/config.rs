//! Bridge configuration

use crate::multicast::ParameterNames;
use crate::transport::PublishMode;

/// Default loopback protocol used to host the distribution stream
pub const DEFAULT_LOOPBACK_PROTOCOL: &str = "rtmfp";

/// Default capacity of the service mailbox
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Bridge configuration options
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Scheme the client URI is rewritten to for the loopback session
    pub loopback_protocol: String,

    /// Query parameter names carrying the multicast settings
    pub parameters: ParameterNames,

    /// Publish type used for the distribution stream
    pub publish_mode: PublishMode,

    /// Bounded capacity of the service event mailbox
    pub mailbox_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            loopback_protocol: DEFAULT_LOOPBACK_PROTOCOL.into(),
            parameters: ParameterNames::default(),
            publish_mode: PublishMode::Live,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Set the loopback protocol
    pub fn loopback_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.loopback_protocol = protocol.into();
        self
    }

    /// Set the query parameter names
    pub fn parameter_names(mut self, names: ParameterNames) -> Self {
        self.parameters = names;
        self
    }

    /// Set the mailbox capacity (at least 1)
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();

        assert_eq!(config.loopback_protocol, "rtmfp");
        assert_eq!(config.parameters.multicast_type, "fms.multicast.type");
        assert_eq!(config.parameters.group_spec, "fms.multicast.groupspec");
        assert_eq!(config.parameters.address, "fms.multicast.address");
        assert_eq!(config.publish_mode, PublishMode::Live);
        assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
    }

    #[test]
    fn test_builder_mailbox_capacity_clamped() {
        let config = BridgeConfig::default().mailbox_capacity(0);

        assert_eq!(config.mailbox_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let names = ParameterNames {
            multicast_type: "type".into(),
            group_spec: "groupSpec".into(),
            address: "address".into(),
        };
        let config = BridgeConfig::default()
            .loopback_protocol("rtmfp2")
            .parameter_names(names.clone())
            .mailbox_capacity(16);

        assert_eq!(config.loopback_protocol, "rtmfp2");
        assert_eq!(config.parameters, names);
        assert_eq!(config.mailbox_capacity, 16);
    }
}

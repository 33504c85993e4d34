//! Republish request validation
//!
//! Turns a decoded parameter map into a typed [`PublishRequest`], or explains
//! why the publish must be rejected.

use std::fmt;

use super::query::QueryParams;

/// Distribution mode requested by the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MulticastType {
    /// IP multicast with peer-to-peer fallback (group + address)
    Fusion,
    /// Raw IP multicast (address only)
    IpMulticast,
    /// Peer-to-peer group only
    PeerToPeer,
}

impl MulticastType {
    /// Parse the numeric wire value (`1`, `2` or `3`)
    pub fn from_value(value: &str) -> Option<Self> {
        match value.trim().parse::<u8>().ok()? {
            1 => Some(MulticastType::Fusion),
            2 => Some(MulticastType::IpMulticast),
            3 => Some(MulticastType::PeerToPeer),
            _ => None,
        }
    }

    /// Numeric wire value
    pub fn value(self) -> u8 {
        match self {
            MulticastType::Fusion => 1,
            MulticastType::IpMulticast => 2,
            MulticastType::PeerToPeer => 3,
        }
    }

    /// Whether a distribution group must be joined before publishing
    pub fn requires_group(self) -> bool {
        matches!(self, MulticastType::Fusion | MulticastType::PeerToPeer)
    }

    /// Whether a raw multicast address must be bound on the stream
    pub fn requires_address(self) -> bool {
        matches!(self, MulticastType::Fusion | MulticastType::IpMulticast)
    }
}

impl fmt::Display for MulticastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MulticastType::Fusion => write!(f, "fusion"),
            MulticastType::IpMulticast => write!(f, "ip-multicast"),
            MulticastType::PeerToPeer => write!(f, "peer-to-peer"),
        }
    }
}

/// Query parameter names carrying the multicast settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterNames {
    /// Multicast type (`1`, `2` or `3`)
    pub multicast_type: String,
    /// Group specifier
    pub group_spec: String,
    /// Multicast address (`ip:port`)
    pub address: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            multicast_type: "fms.multicast.type".into(),
            group_spec: "fms.multicast.groupspec".into(),
            address: "fms.multicast.address".into(),
        }
    }
}

/// A validated republish request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub multicast_type: MulticastType,
    pub group_spec: String,
    /// Present exactly when the type requires an address
    pub address: Option<String>,
}

/// Reason a publish request was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No parameters at all
    NoParameters,
    /// Type parameter absent
    MissingType,
    /// Type parameter not one of 1, 2, 3
    InvalidType(String),
    /// Group spec absent or empty
    MissingGroupSpec,
    /// Address absent or empty for a type that needs one
    MissingAddress(MulticastType),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NoParameters => write!(f, "no multicast parameters"),
            RequestError::MissingType => write!(f, "missing multicast type"),
            RequestError::InvalidType(value) => write!(f, "invalid multicast type: {}", value),
            RequestError::MissingGroupSpec => write!(f, "missing group specifier"),
            RequestError::MissingAddress(kind) => {
                write!(f, "missing multicast address for {} publish", kind)
            }
        }
    }
}

impl std::error::Error for RequestError {}

/// Validate decoded parameters against the republish schema
///
/// Rules are checked in order and the first failure is returned.
pub fn validate(
    params: &QueryParams,
    names: &ParameterNames,
) -> Result<PublishRequest, RequestError> {
    let result = check(params, names);

    if let Err(ref e) = result {
        tracing::warn!(reason = %e, "Publish request rejected");
    }

    result
}

fn check(params: &QueryParams, names: &ParameterNames) -> Result<PublishRequest, RequestError> {
    if params.is_empty() {
        return Err(RequestError::NoParameters);
    }

    let raw_type = params
        .get(&names.multicast_type)
        .ok_or(RequestError::MissingType)?;
    let multicast_type = MulticastType::from_value(raw_type)
        .ok_or_else(|| RequestError::InvalidType(raw_type.clone()))?;

    let group_spec = non_empty(params, &names.group_spec).ok_or(RequestError::MissingGroupSpec)?;

    let address = if multicast_type.requires_address() {
        let address = non_empty(params, &names.address)
            .ok_or(RequestError::MissingAddress(multicast_type))?;
        Some(address.to_string())
    } else {
        None
    };

    Ok(PublishRequest {
        multicast_type,
        group_spec: group_spec.to_string(),
        address,
    })
}

fn non_empty<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

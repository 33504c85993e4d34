//! Publishing client identity
//!
//! What the media host tells the bridge about the peer behind a publish.

use std::net::IpAddr;

/// The client that published a source stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishingClient {
    /// Host-assigned connection ID
    pub id: u64,

    /// Remote peer address, compared on release
    pub address: IpAddr,

    /// URI the client connected with (e.g. `rtmp://host/multicast`)
    pub uri: String,
}

impl PublishingClient {
    pub fn new(id: u64, address: IpAddr, uri: impl Into<String>) -> Self {
        Self {
            id,
            address,
            uri: uri.into(),
        }
    }
}

//! # Addressing
//!
//! A [`NetId`] names an endpoint (`subnet.id`), an [`Address`] adds a port
//! (`subnet.id:port`). Both are small `Copy` values compared structurally.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Ports handed out to sockets created without an explicit local port.
pub const EPHEMERAL_PORTS: RangeInclusive<u16> = 49152..=65535;

/// Network identity of an endpoint: the subnet it lives in plus a host id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetId {
    subnet: u32,
    id: u32,
}

impl NetId {
    /// Creates a net id.
    #[must_use]
    pub const fn new(subnet: u32, id: u32) -> Self {
        Self { subnet, id }
    }

    /// Subnet number.
    #[must_use]
    pub const fn subnet(self) -> u32 {
        self.subnet
    }

    /// Host id within the subnet.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Returns true if both ids live in the same subnet.
    #[must_use]
    pub const fn same_subnet(self, other: Self) -> bool {
        self.subnet == other.subnet
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subnet, self.id)
    }
}

impl FromStr for NetId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AddressError::Malformed(s.to_owned());
        let (subnet, id) = s.split_once('.').ok_or_else(malformed)?;
        Ok(Self {
            subnet: subnet.trim().parse().map_err(|_| malformed())?,
            id: id.trim().parse().map_err(|_| malformed())?,
        })
    }
}

/// A port on an endpoint.
///
/// Port 0 is rejected at construction, so every `Address` in the system is
/// routable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAddress")]
pub struct Address {
    net_id: NetId,
    port: u16,
}

#[derive(Deserialize)]
struct RawAddress {
    net_id: NetId,
    port: u16,
}

impl TryFrom<RawAddress> for Address {
    type Error = AddressError;

    fn try_from(raw: RawAddress) -> Result<Self, Self::Error> {
        Self::new(raw.net_id, raw.port)
    }
}

impl Address {
    /// Creates an address.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPort` for port 0.
    pub fn new(net_id: NetId, port: u16) -> Result<Self, AddressError> {
        if port == 0 {
            return Err(AddressError::InvalidPort(0));
        }
        Ok(Self { net_id, port })
    }

    /// Endpoint part.
    #[must_use]
    pub const fn net_id(self) -> NetId {
        self.net_id
    }

    /// Port part.
    #[must_use]
    pub const fn port(self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.net_id, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (net_id, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::Malformed(s.to_owned()))?;
        let port: u32 = port
            .trim()
            .parse()
            .map_err(|_| AddressError::Malformed(s.to_owned()))?;
        let port = u16::try_from(port).map_err(|_| AddressError::InvalidPort(port))?;
        Self::new(net_id.parse()?, port)
    }
}

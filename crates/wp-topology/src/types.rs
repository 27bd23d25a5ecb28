//! Core value types shared by resources, grants and the graph

use crate::error::SpecificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Stable identifier of a resource within one graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier derived from a free-form name.
    ///
    /// Logical ids are alphanumeric, so everything else is dropped:
    /// `wp-db` becomes `wpdb`.
    pub fn from_name(name: &str) -> Self {
        Self(name.chars().filter(char::is_ascii_alphanumeric).collect())
    }

    /// Derive a child identifier, e.g. `Vpc` + `PublicSubnet1`.
    pub fn child(&self, suffix: &str) -> Self {
        Self(format!("{}{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Runtime attribute of a declared resource
///
/// Attributes are only known once the provisioning engine has created the
/// resource; the graph carries them as references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Primary physical identifier
    Id,
    Arn,
    EndpointAddress,
    EndpointPort,
    DnsName,
    CanonicalHostedZoneId,
    GroupId,
    CidrBlock,
}

impl Attribute {
    /// Attribute name as the control plane spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Id => "Ref",
            Attribute::Arn => "Arn",
            Attribute::EndpointAddress => "Endpoint.Address",
            Attribute::EndpointPort => "Endpoint.Port",
            Attribute::DnsName => "DNSName",
            Attribute::CanonicalHostedZoneId => "CanonicalHostedZoneID",
            Attribute::GroupId => "GroupId",
            Attribute::CidrBlock => "CidrBlock",
        }
    }
}

/// Declaration-phase handle to a runtime attribute
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttrRef {
    pub target: LogicalId,
    pub attribute: Attribute,
}

/// A property value: either known now, or resolved during provisioning
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Literal(String),
    Ref(AttrRef),
    /// A field of a generated secret; never materialised in the graph.
    SecretField { secret: LogicalId, field: String },
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal(value.into())
    }

    pub fn attr(target: &LogicalId, attribute: Attribute) -> Self {
        Value::Ref(AttrRef {
            target: target.clone(),
            attribute,
        })
    }

    pub fn secret_field(secret: &LogicalId, field: &str) -> Self {
        Value::SecretField {
            secret: secret.clone(),
            field: field.to_string(),
        }
    }

    /// Resource this value depends on, if any.
    pub fn reference(&self) -> Option<&LogicalId> {
        match self {
            Value::Literal(_) => None,
            Value::Ref(r) => Some(&r.target),
            Value::SecretField { secret, .. } => Some(secret),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            _ => None,
        }
    }
}

/// IPv4 network block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cidr {
    addr: Ipv4Addr,
    mask: u8,
}

impl Cidr {
    pub fn new(addr: Ipv4Addr, mask: u8) -> Result<Self, SpecificationError> {
        if mask > 32 {
            return Err(SpecificationError::InvalidCidr(format!("{addr}/{mask}")));
        }
        let cidr = Self { addr, mask };
        if cidr.network() != u32::from(addr) {
            // host bits set
            return Err(SpecificationError::InvalidCidr(cidr.to_string()));
        }
        Ok(cidr)
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    fn netmask(&self) -> u32 {
        if self.mask == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.mask))
        }
    }

    fn network(&self) -> u32 {
        u32::from(self.addr) & self.netmask()
    }

    fn broadcast(&self) -> u32 {
        self.network() | !self.netmask()
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &Cidr) -> bool {
        other.mask >= self.mask
            && other.network() >= self.network()
            && other.broadcast() <= self.broadcast()
    }

    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.network() <= other.broadcast() && other.network() <= self.broadcast()
    }

    /// The `index`-th sub-block of size `/new_mask`.
    pub fn subnet(&self, new_mask: u8, index: u32) -> Result<Cidr, SpecificationError> {
        if new_mask < self.mask || new_mask > 32 {
            return Err(SpecificationError::CidrOutOfRange {
                cidr: self.to_string(),
                mask: new_mask,
            });
        }
        let available = 1u64 << (new_mask - self.mask);
        if u64::from(index) >= available {
            return Err(SpecificationError::AddressSpaceExhausted {
                cidr: self.to_string(),
                requested: u64::from(index) + 1,
            });
        }
        let step = if new_mask == 32 { 1 } else { 1u32 << (32 - new_mask) };
        let addr = Ipv4Addr::from(self.network() + index * step);
        Cidr::new(addr, new_mask)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl FromStr for Cidr {
    type Err = SpecificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, mask) = s
            .split_once('/')
            .ok_or_else(|| SpecificationError::InvalidCidr(s.to_string()))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| SpecificationError::InvalidCidr(s.to_string()))?;
        let mask: u8 = mask
            .parse()
            .map_err(|_| SpecificationError::InvalidCidr(s.to_string()))?;
        Cidr::new(addr, mask)
    }
}

impl Serialize for Cidr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of inbound traffic in a security-group rule
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    Ipv4(Cidr),
    AnyIpv4,
    SecurityGroup(LogicalId),
}

impl Peer {
    pub fn security_group(&self) -> Option<&LogicalId> {
        match self {
            Peer::SecurityGroup(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortRange {
    Tcp(u16),
    AllTraffic,
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRange::Tcp(port) => write!(f, "tcp/{port}"),
            PortRange::AllTraffic => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubnetType {
    Public,
    PrivateWithEgress,
}

/// What happens to a resource when the deployment is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
    Snapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_parse_and_display() {
        let cidr: Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(cidr.mask(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn test_cidr_rejects_host_bits_and_garbage() {
        assert!("10.0.0.1/16".parse::<Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Cidr>().is_err());
        assert!("10.0.0.0".parse::<Cidr>().is_err());
        assert!("not-a-cidr/8".parse::<Cidr>().is_err());
    }

    #[test]
    fn test_subnet_carving() {
        let vpc: Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(vpc.subnet(24, 0).unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(vpc.subnet(24, 3).unwrap().to_string(), "10.0.3.0/24");
        assert!(vpc.subnet(24, 256).is_err());
        assert!(vpc.subnet(8, 0).is_err());
    }

    #[test]
    fn test_contains_and_overlaps() {
        let vpc: Cidr = "10.0.0.0/16".parse().unwrap();
        let inside: Cidr = "10.0.1.0/24".parse().unwrap();
        let outside: Cidr = "10.1.0.0/24".parse().unwrap();
        assert!(vpc.contains(&inside));
        assert!(!vpc.contains(&outside));
        assert!(vpc.overlaps(&inside));
        assert!(!inside.overlaps(&outside));
    }

    #[test]
    fn test_names_become_alphanumeric_ids() {
        assert_eq!(LogicalId::from_name("site_vpc").as_str(), "sitevpc");
        assert_eq!(LogicalId::from_name("wp-db").as_str(), "wpdb");
        assert_eq!(LogicalId::from_name("SgFrom0.0.0.0/0:tcp/443").as_str(), "SgFrom0000tcp443");
        assert!(LogicalId::from_name("--").is_empty());
    }

    #[test]
    fn test_value_reference() {
        let db = LogicalId::new("db");
        assert_eq!(Value::attr(&db, Attribute::EndpointAddress).reference(), Some(&db));
        assert_eq!(Value::literal("x").reference(), None);
        assert_eq!(Value::literal("x").as_literal(), Some("x"));
    }
}

//! Error types for topology construction
//!
//! - Lookup failures against pre-existing cloud entities
//! - Specification errors in parameters (CIDRs, ports, identifiers)
//! - Graph integrity violations (dangling or forward references, cycles)
//! - Post-build invariant violations found by the validator
//!
//! Every one of these aborts the build. There is no partial graph.

use crate::types::{LogicalId, PortRange};

/// Umbrella error returned by the builder
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A required external entity could not be resolved
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// Conflicting or out-of-range parameters
    #[error("invalid specification: {0}")]
    Specification(#[from] SpecificationError),

    /// The graph would contain a dangling reference, duplicate or cycle
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// The finished graph broke a structural invariant
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl BuildError {
    /// Missing hosted zone, machine image or availability zones.
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }

    #[inline]
    #[must_use]
    pub fn is_specification(&self) -> bool {
        matches!(self, Self::Specification(_))
    }
}

/// External lookup failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no hosted zone found for domain '{domain}'")]
    HostedZoneNotFound { domain: String },

    #[error("no machine image named '{pattern}' owned by {owner} in {region}")]
    MachineImageNotFound {
        pattern: String,
        owner: String,
        region: String,
    },

    #[error("region {region} has {found} availability zones, {required} required")]
    InsufficientAvailabilityZones {
        region: String,
        found: usize,
        required: usize,
    },
}

/// Parameter errors detected while declaring resources
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecificationError {
    #[error("invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("mask /{mask} is not usable inside {cidr}")]
    CidrOutOfRange { cidr: String, mask: u8 },

    #[error("{cidr} cannot hold {requested} subnets")]
    AddressSpaceExhausted { cidr: String, requested: u64 },

    #[error("port {port} is used by both {first} and {second}")]
    PortCollision {
        port: u16,
        first: String,
        second: String,
    },
}

/// Graph integrity errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("resource '{0}' declared twice")]
    DuplicateResource(LogicalId),

    #[error("'{from}' references undeclared resource '{to}'")]
    DanglingReference { from: LogicalId, to: LogicalId },

    #[error("resource '{0}' not found")]
    ResourceNotFound(LogicalId),

    #[error("'{0}' references itself")]
    SelfLoop(LogicalId),

    #[error("edge {from} -> {to} would create a cycle")]
    CycleDetected { from: LogicalId, to: LogicalId },

    #[error("modifying '{id}' changed its kind")]
    KindChanged { id: LogicalId },

    #[error("'{id}' is not a {expected}")]
    UnexpectedKind { id: LogicalId, expected: String },

    #[error("'{from}' references '{to}', which is declared after it")]
    ForwardReference { from: LogicalId, to: LogicalId },

    #[error("'{target}' does not expose attribute {attribute}")]
    UnsupportedAttribute { target: LogicalId, attribute: String },

    #[error("grant on '{target}' requires a {expected}")]
    InvalidGrantTarget { target: LogicalId, expected: String },

    #[error("resource identifier must not be empty")]
    EmptyIdentifier,
}

/// Structural invariants checked on the finished graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected exactly one network, found {0}")]
    NetworkCount(usize),

    #[error("expected {expected} availability zones, found {found}")]
    AvailabilityZoneCount { expected: usize, found: usize },

    #[error("availability zone {zone} must have one public and one private subnet")]
    SubnetLayout { zone: String },

    #[error("subnet {subnet} lies outside the network block")]
    SubnetOutsideNetwork { subnet: LogicalId },

    #[error("subnets {first} and {second} overlap")]
    SubnetOverlap { first: LogicalId, second: LogicalId },

    #[error("private subnet {subnet} has no NAT egress in its availability zone")]
    MissingEgress { subnet: LogicalId },

    #[error("expected {expected} NAT instances, found {found}")]
    NatInstanceCount { expected: usize, found: usize },

    #[error("{source_group} admits {peer} on {port} but {peer} has no matching egress")]
    UnreachablePeer {
        source_group: LogicalId,
        peer: LogicalId,
        port: PortRange,
    },

    #[error("database {database} ingress too wide: {detail}")]
    DatabaseIngress { database: LogicalId, detail: String },

    #[error("filesystem {file_system} policy statement lacks the mount-target condition")]
    MissingMountTargetCondition { file_system: LogicalId },

    #[error("ingress on {group} for {port} is not allowed")]
    UnexpectedIngress { group: LogicalId, port: PortRange },

    #[error("expected exactly one {kind}, found {found}")]
    ResourceCount { kind: String, found: usize },

    #[error("subnet {subnet} uses mask /{mask}, allowed range is /16 to /28")]
    SubnetMask { subnet: LogicalId, mask: u8 },

    #[error("port {port} is claimed by both {first} and {second}")]
    PortCollision {
        port: u16,
        first: LogicalId,
        second: LogicalId,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_errors_are_configuration_errors() {
        let err: BuildError = LookupError::HostedZoneNotFound {
            domain: "example.com".into(),
        }
        .into();
        assert!(err.is_configuration());
        assert!(!err.is_specification());
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_specification_classification() {
        let err: BuildError = SpecificationError::InvalidCidr("bogus".into()).into();
        assert!(err.is_specification());
        assert!(!err.is_configuration());
    }
}

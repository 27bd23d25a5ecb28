//! Resolution phase
//!
//! The graph only holds references; real values appear once the provisioning
//! engine creates resources. [`resolve`] plays that role offline: it assigns
//! physical identifiers, derives runtime attributes and generates secret
//! values, so references can be followed end to end.

use crate::graph::ResourceGraph;
use crate::resource::{ResourceKind, ResourceProps};
use crate::types::{AttrRef, Attribute, LogicalId, Value};
use rand::Rng;
use std::collections::BTreeMap;

/// Printable ASCII without space, the provider's default password alphabet.
const PASSWORD_ALPHABET: std::ops::RangeInclusive<u8> = b'!'..=b'~';

/// Runtime view of a graph
#[derive(Debug, Clone, Default)]
pub struct ResolvedGraph {
    physical_ids: BTreeMap<LogicalId, String>,
    attributes: BTreeMap<AttrRef, String>,
    secrets: BTreeMap<LogicalId, BTreeMap<String, String>>,
}

impl ResolvedGraph {
    pub fn physical_id(&self, id: &LogicalId) -> Option<&str> {
        self.physical_ids.get(id).map(String::as_str)
    }

    pub fn attribute(&self, reference: &AttrRef) -> Option<&str> {
        self.attributes.get(reference).map(String::as_str)
    }

    /// Materialised fields of a generated secret.
    pub fn secret(&self, id: &LogicalId) -> Option<&BTreeMap<String, String>> {
        self.secrets.get(id)
    }

    /// Follow a property value to its runtime string.
    pub fn value(&self, value: &Value) -> Option<String> {
        match value {
            Value::Literal(s) => Some(s.clone()),
            Value::Ref(reference) => self.attribute(reference).map(str::to_string),
            Value::SecretField { secret, field } => {
                self.secrets.get(secret).and_then(|f| f.get(field)).cloned()
            }
        }
    }
}

/// Draw a password of `length` characters, none of them in `exclude`.
///
/// Returns an empty string when every candidate character is excluded.
pub fn generate_password<R: Rng>(rng: &mut R, length: usize, exclude: &str) -> String {
    let alphabet: Vec<char> = PASSWORD_ALPHABET
        .map(char::from)
        .filter(|c| !exclude.contains(*c))
        .collect();
    if alphabet.is_empty() {
        return String::new();
    }
    (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

fn short_id<R: Rng>(rng: &mut R) -> String {
    let uuid = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    uuid.simple().to_string()[..17].to_string()
}

fn id_prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Vpc => "vpc",
        ResourceKind::Subnet => "subnet",
        ResourceKind::SecurityGroup => "sg",
        ResourceKind::InternetGateway => "igw",
        ResourceKind::NatInstance => "i",
        ResourceKind::FileSystem => "fs",
        ResourceKind::MountTarget => "fsmt",
        ResourceKind::AccessPoint => "fsap",
        _ => "",
    }
}

fn service_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Certificate => "acm",
        ResourceKind::Secret => "secretsmanager",
        ResourceKind::FileSystem | ResourceKind::AccessPoint => "elasticfilesystem",
        ResourceKind::Cluster | ResourceKind::TaskDefinition | ResourceKind::Service => "ecs",
        ResourceKind::LoadBalancer | ResourceKind::TargetGroup | ResourceKind::Listener => {
            "elasticloadbalancing"
        }
        ResourceKind::LogGroup => "logs",
        ResourceKind::Role => "iam",
        ResourceKind::DatabaseInstance | ResourceKind::DbSubnetGroup => "rds",
        _ => "ec2",
    }
}

/// Assign runtime values to every resource, in creation order.
pub fn resolve<R: Rng>(graph: &ResourceGraph, region: &str, rng: &mut R) -> ResolvedGraph {
    let mut resolved = ResolvedGraph::default();

    for resource in graph.resources() {
        let kind = resource.kind();
        let physical = match &resource.props {
            ResourceProps::HostedZone(zone) => zone.zone_id.clone(),
            ResourceProps::DatabaseInstance(db) => db.identifier.clone(),
            _ => match id_prefix(kind) {
                "" => format!("{}-{}", resource.id, short_id(rng)),
                prefix => format!("{prefix}-{}", short_id(rng)),
            },
        };

        let mut attributes = vec![(Attribute::Id, physical.clone())];
        if kind.supports(Attribute::Arn) {
            attributes.push((
                Attribute::Arn,
                format!("arn:aws:{}:{region}::{physical}", service_name(kind)),
            ));
        }
        match &resource.props {
            ResourceProps::DatabaseInstance(db) => {
                attributes.push((
                    Attribute::EndpointAddress,
                    format!("{}.{}.{region}.rds.amazonaws.com", db.identifier, &short_id(rng)[..12]),
                ));
                attributes.push((Attribute::EndpointPort, db.port.to_string()));
            }
            ResourceProps::LoadBalancer(_) => {
                attributes.push((
                    Attribute::DnsName,
                    format!("{physical}.{region}.elb.amazonaws.com"),
                ));
                attributes.push((
                    Attribute::CanonicalHostedZoneId,
                    format!("Z{}", short_id(rng).to_ascii_uppercase()),
                ));
            }
            ResourceProps::SecurityGroup(_) => {
                attributes.push((Attribute::GroupId, physical.clone()));
            }
            ResourceProps::Vpc(p) => attributes.push((Attribute::CidrBlock, p.cidr.to_string())),
            ResourceProps::Subnet(p) => attributes.push((Attribute::CidrBlock, p.cidr.to_string())),
            ResourceProps::Secret(secret) => {
                let mut fields = secret.template.clone();
                fields.insert(
                    secret.generate_key.clone(),
                    generate_password(rng, secret.password_length, &secret.exclude_characters),
                );
                resolved.secrets.insert(resource.id.clone(), fields);
            }
            _ => {}
        }

        for (attribute, value) in attributes {
            resolved.attributes.insert(
                AttrRef {
                    target: resource.id.clone(),
                    attribute,
                },
                value,
            );
        }
        resolved.physical_ids.insert(resource.id.clone(), physical);
    }

    tracing::debug!(resources = resolved.physical_ids.len(), "graph resolved");
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_password_respects_exclusions_and_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let password = generate_password(&mut rng, 32, "/@\"");
        assert_eq!(password.chars().count(), 32);
        assert!(!password.contains(['/', '@', '"', ' ']));
    }

    #[test]
    fn test_password_with_empty_alphabet() {
        let mut rng = StdRng::seed_from_u64(1);
        let everything: String = PASSWORD_ALPHABET.map(char::from).collect();
        assert_eq!(generate_password(&mut rng, 8, &everything), "");
    }

    #[test]
    fn test_short_ids_are_hex() {
        let mut rng = StdRng::seed_from_u64(3);
        let id = short_id(&mut rng);
        assert_eq!(id.len(), 17);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_literal_values_resolve_to_themselves() {
        let resolved = ResolvedGraph::default();
        assert_eq!(resolved.value(&Value::literal("512M")).as_deref(), Some("512M"));
        assert_eq!(
            resolved.value(&Value::attr(&LogicalId::new("db"), Attribute::EndpointAddress)),
            None
        );
    }
}

//! Post-build Validation
//!
//! Checks the finished graph against the deployment's structural invariants.
//! Runs once at the end of every build; a graph that fails here is never
//! handed to a caller.

use crate::defaults;
use crate::error::{GraphError, ValidationError};
use crate::graph::{Grant, ResourceGraph};
use crate::resource::{Egress, ListenerProps, ResourceKind, ResourceProps, SubnetProps, VpcProps};
use crate::types::{Cidr, LogicalId, Peer, PortRange, SubnetType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Subnet masks accepted by the network provider
pub const MASK_RANGE: std::ops::RangeInclusive<u8> = 16..=28;

/// Summary of a validated graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub resource_count: usize,
    pub edge_count: usize,
    pub grant_count: usize,
    pub fingerprint: String,
}

/// Validate a complete graph
///
/// 1. References and ordering (re-checked)
/// 2. Inventory of single-instance resources
/// 3. Network layout and NAT placement
/// 4. Database perimeter
/// 5. Filesystem policy
/// 6. Port plan
/// 7. Internet exposure
/// 8. Egress for every security-group peer
pub fn validate(graph: &ResourceGraph) -> Result<ValidationReport, ValidationError> {
    validate_references(graph)?;
    validate_inventory(graph)?;
    validate_network(graph)?;
    validate_database_ingress(graph)?;
    validate_filesystem_policy(graph)?;
    validate_ports(graph)?;
    validate_public_exposure(graph)?;
    validate_peer_egress(graph)?;

    Ok(ValidationReport {
        resource_count: graph.len(),
        edge_count: graph.edge_count(),
        grant_count: graph.grants().count(),
        fingerprint: graph.fingerprint(),
    })
}

fn validate_references(graph: &ResourceGraph) -> Result<(), ValidationError> {
    for resource in graph.resources() {
        for to in resource.references().into_iter().chain(&resource.depends_on) {
            if !graph.contains(to) {
                return Err(GraphError::DanglingReference {
                    from: resource.id.clone(),
                    to: to.clone(),
                }
                .into());
            }
        }
    }
    graph.topological_order()?;
    Ok(())
}

/// Kinds a deployment declares exactly once
pub const SINGLETONS: [ResourceKind; 12] = [
    ResourceKind::HostedZone,
    ResourceKind::Certificate,
    ResourceKind::NatProvider,
    ResourceKind::Secret,
    ResourceKind::DatabaseInstance,
    ResourceKind::FileSystem,
    ResourceKind::AccessPoint,
    ResourceKind::Cluster,
    ResourceKind::LoadBalancer,
    ResourceKind::TaskDefinition,
    ResourceKind::Service,
    ResourceKind::AliasRecord,
];

fn validate_inventory(graph: &ResourceGraph) -> Result<(), ValidationError> {
    for kind in SINGLETONS {
        let found = graph.count_of(kind);
        if found != 1 {
            return Err(ValidationError::ResourceCount {
                kind: kind.type_name().to_string(),
                found,
            });
        }
    }
    Ok(())
}

fn validate_network(graph: &ResourceGraph) -> Result<(), ValidationError> {
    let vpcs: Vec<_> = graph
        .resources_of_kind(ResourceKind::Vpc)
        .filter_map(|r| match &r.props {
            ResourceProps::Vpc(p) => Some((&r.id, p)),
            _ => None,
        })
        .collect();
    let [(vpc_id, vpc)] = vpcs.as_slice() else {
        return Err(ValidationError::NetworkCount(vpcs.len()));
    };
    check_mask(vpc_id, &vpc.cidr)?;

    let subnets: Vec<(&LogicalId, &SubnetProps)> = graph
        .resources_of_kind(ResourceKind::Subnet)
        .filter_map(|r| match &r.props {
            ResourceProps::Subnet(p) if p.vpc == **vpc_id => Some((&r.id, p)),
            _ => None,
        })
        .collect();

    // zone -> (public, private)
    let mut zones: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (_, subnet) in &subnets {
        let slot = zones.entry(subnet.availability_zone.as_str()).or_default();
        match subnet.subnet_type {
            SubnetType::Public => slot.0 += 1,
            SubnetType::PrivateWithEgress => slot.1 += 1,
        }
    }
    if zones.len() != vpc.max_azs {
        return Err(ValidationError::AvailabilityZoneCount {
            expected: vpc.max_azs,
            found: zones.len(),
        });
    }
    if let Some((zone, _)) = zones.iter().find(|(_, counts)| **counts != (1, 1)) {
        return Err(ValidationError::SubnetLayout {
            zone: (*zone).to_string(),
        });
    }

    for (i, (id, subnet)) in subnets.iter().enumerate() {
        check_mask(id, &subnet.cidr)?;
        if !vpc.cidr.contains(&subnet.cidr) {
            return Err(ValidationError::SubnetOutsideNetwork {
                subnet: (*id).clone(),
            });
        }
        if let Some((other, _)) = subnets[i + 1..]
            .iter()
            .find(|(_, s)| s.cidr.overlaps(&subnet.cidr))
        {
            return Err(ValidationError::SubnetOverlap {
                first: (*id).clone(),
                second: (*other).clone(),
            });
        }
    }

    validate_nat_placement(graph, vpc, &subnets)
}

/// Every private subnet routes through a NAT instance that sits in a public
/// subnet, in its own zone whenever that zone has one.
fn validate_nat_placement(
    graph: &ResourceGraph,
    vpc: &VpcProps,
    subnets: &[(&LogicalId, &SubnetProps)],
) -> Result<(), ValidationError> {
    let expected = match graph.resource(&vpc.nat_provider).map(|r| &r.props) {
        Some(ResourceProps::NatProvider(provider)) => provider.instances,
        _ => return Err(GraphError::ResourceNotFound(vpc.nat_provider.clone()).into()),
    };

    // instance -> zone of its public subnet
    let mut placed: HashMap<&LogicalId, &str> = HashMap::new();
    for resource in graph.resources_of_kind(ResourceKind::NatInstance) {
        let ResourceProps::NatInstance(nat) = &resource.props else {
            continue;
        };
        if nat.provider != vpc.nat_provider {
            continue;
        }
        let zone = subnets.iter().find_map(|(id, s)| {
            (**id == nat.subnet && s.subnet_type == SubnetType::Public)
                .then_some(s.availability_zone.as_str())
        });
        if let Some(zone) = zone {
            placed.insert(&resource.id, zone);
        }
    }
    if placed.len() != expected {
        return Err(ValidationError::NatInstanceCount {
            expected,
            found: placed.len(),
        });
    }

    for (id, subnet) in subnets {
        if subnet.subnet_type != SubnetType::PrivateWithEgress {
            continue;
        }
        let zone = subnet.availability_zone.as_str();
        let zone_has_nat = placed.values().any(|z| *z == zone);
        let routed = match &subnet.egress {
            Egress::Nat(nat) => placed
                .get(nat)
                .is_some_and(|z| !zone_has_nat || *z == zone),
            Egress::InternetGateway(_) => false,
        };
        if !routed {
            return Err(ValidationError::MissingEgress {
                subnet: (*id).clone(),
            });
        }
    }
    Ok(())
}

fn check_mask(id: &LogicalId, cidr: &Cidr) -> Result<(), ValidationError> {
    if MASK_RANGE.contains(&cidr.mask()) {
        Ok(())
    } else {
        Err(ValidationError::SubnetMask {
            subnet: id.clone(),
            mask: cidr.mask(),
        })
    }
}

/// Exactly one peer, a security group, on exactly the database port.
fn validate_database_ingress(graph: &ResourceGraph) -> Result<(), ValidationError> {
    for resource in graph.resources_of_kind(ResourceKind::DatabaseInstance) {
        let ResourceProps::DatabaseInstance(db) = &resource.props else {
            continue;
        };
        let rules = graph.ingress_rules(&db.security_group);
        let fail = |detail: String| ValidationError::DatabaseIngress {
            database: resource.id.clone(),
            detail,
        };
        match rules.as_slice() {
            [(Peer::SecurityGroup(_), PortRange::Tcp(port))] if *port == db.port => {}
            [(peer, port)] => {
                return Err(fail(format!("rule {peer:?} on {port} does not match tcp/{}", db.port)));
            }
            _ => return Err(fail(format!("{} rules, expected exactly 1", rules.len()))),
        }
    }
    Ok(())
}

fn validate_filesystem_policy(graph: &ResourceGraph) -> Result<(), ValidationError> {
    for resource in graph.resources_of_kind(ResourceKind::FileSystem) {
        let ResourceProps::FileSystem(fs) = &resource.props else {
            continue;
        };
        let unconditioned = fs.policy.iter().any(|statement| {
            !statement.has_condition("Bool", defaults::EFS_MOUNT_TARGET_CONDITION_KEY, "true")
        });
        if unconditioned {
            return Err(ValidationError::MissingMountTargetCondition {
                file_system: resource.id.clone(),
            });
        }
    }
    Ok(())
}

/// Listener ports are unique per load balancer, and no container listens on
/// a database port.
fn validate_ports(graph: &ResourceGraph) -> Result<(), ValidationError> {
    let mut claimed: HashMap<(&LogicalId, u16), &LogicalId> = HashMap::new();
    for resource in graph.resources_of_kind(ResourceKind::Listener) {
        let ResourceProps::Listener(ListenerProps {
            load_balancer,
            port,
            ..
        }) = &resource.props
        else {
            continue;
        };
        if let Some(first) = claimed.insert((load_balancer, *port), &resource.id) {
            return Err(ValidationError::PortCollision {
                port: *port,
                first: first.clone(),
                second: resource.id.clone(),
            });
        }
    }

    let database_ports: Vec<(&LogicalId, u16)> = graph
        .resources_of_kind(ResourceKind::DatabaseInstance)
        .filter_map(|r| match &r.props {
            ResourceProps::DatabaseInstance(db) => Some((&r.id, db.port)),
            _ => None,
        })
        .collect();
    for resource in graph.resources_of_kind(ResourceKind::TaskDefinition) {
        let ResourceProps::TaskDefinition(task) = &resource.props else {
            continue;
        };
        let container_ports = task.containers.iter().flat_map(|c| c.port_mappings.iter());
        for port in container_ports {
            if let Some((db, _)) = database_ports.iter().find(|(_, p)| p == port) {
                return Err(ValidationError::PortCollision {
                    port: *port,
                    first: (*db).clone(),
                    second: resource.id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Only load balancer security groups accept traffic from anywhere.
fn validate_public_exposure(graph: &ResourceGraph) -> Result<(), ValidationError> {
    let public_groups: Vec<&LogicalId> = graph
        .resources_of_kind(ResourceKind::LoadBalancer)
        .filter_map(|r| match &r.props {
            ResourceProps::LoadBalancer(lb) if lb.internet_facing => Some(&lb.security_group),
            _ => None,
        })
        .collect();
    for grant in graph.grants() {
        if let Grant::Ingress {
            group,
            peer: Peer::AnyIpv4,
            port,
        } = grant
        {
            if !public_groups.contains(&group) {
                return Err(ValidationError::UnexpectedIngress {
                    group: group.clone(),
                    port: *port,
                });
            }
        }
    }
    Ok(())
}

/// A group without blanket outbound access needs an explicit egress rule
/// for each group that admits it.
fn validate_peer_egress(graph: &ResourceGraph) -> Result<(), ValidationError> {
    for grant in graph.grants() {
        let Grant::Ingress {
            group,
            peer: Peer::SecurityGroup(source),
            port,
        } = grant
        else {
            continue;
        };
        let restricted = matches!(
            graph.resource(source).map(|r| &r.props),
            Some(ResourceProps::SecurityGroup(sg)) if !sg.allow_all_outbound
        );
        if !restricted {
            continue;
        }
        let target = Peer::SecurityGroup(group.clone());
        let covered = graph
            .egress_rules(source)
            .into_iter()
            .any(|(peer, p)| *peer == target && p == *port);
        if !covered {
            return Err(ValidationError::UnreachablePeer {
                source_group: group.clone(),
                peer: source.clone(),
                port: *port,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_topology;
    use crate::config::DeploymentConfig;
    use crate::context::{MachineImage, StaticContext};
    use crate::resource::{NatInstanceProps, PolicyStatement, Principal, Resource, SecretProps};

    fn built() -> ResourceGraph {
        let context = StaticContext::new()
            .with_hosted_zone("example.com", "Z0EXAMPLE")
            .with_machine_image(
                "us-east-1",
                MachineImage {
                    image_id: "ami-0123".into(),
                    name: "fck-nat-amzn2-1.3.0-arm64-ebs".into(),
                    owner: defaults::NAT_IMAGE_OWNER.into(),
                    creation_date: "2024-01-01".into(),
                },
            );
        let config = DeploymentConfig::from_pairs([("DOMAIN", "example.com")]);
        build_topology(&config, &context).unwrap()
    }

    fn database_group(graph: &ResourceGraph) -> LogicalId {
        graph
            .resources_of_kind(ResourceKind::DatabaseInstance)
            .find_map(|r| match &r.props {
                ResourceProps::DatabaseInstance(db) => Some(db.security_group.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_built_graph_validates() {
        let graph = built();
        let report = validate(&graph).unwrap();
        assert_eq!(report.resource_count, graph.len());
        assert_eq!(report.fingerprint, graph.fingerprint());
    }

    #[test]
    fn test_extra_database_rule_is_rejected() {
        let mut graph = built();
        let group = database_group(&graph);
        graph
            .grant(Grant::Ingress {
                group,
                peer: Peer::Ipv4("10.0.0.0/16".parse().unwrap()),
                port: PortRange::Tcp(3306),
            })
            .unwrap();
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::DatabaseIngress { .. })
        ));
    }

    #[test]
    fn test_unconditioned_filesystem_statement_is_rejected() {
        let mut graph = built();
        let fs = graph
            .resources_of_kind(ResourceKind::FileSystem)
            .next()
            .unwrap()
            .id
            .clone();
        graph
            .modify(&fs, |props| {
                if let ResourceProps::FileSystem(p) = props {
                    p.add_to_resource_policy(PolicyStatement::allow(
                        &["elasticfilesystem:ClientMount"],
                        Principal::Any,
                    ));
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(
            validate(&graph),
            Err(ValidationError::MissingMountTargetCondition { file_system: fs })
        );
    }

    #[test]
    fn test_public_ingress_outside_load_balancer_is_rejected() {
        let mut graph = built();
        let group = LogicalId::new("FileSystemEfsSecurityGroup");
        graph
            .grant(Grant::Ingress {
                group: group.clone(),
                peer: Peer::AnyIpv4,
                port: PortRange::Tcp(defaults::EFS_PORT),
            })
            .unwrap();
        assert_eq!(
            validate(&graph),
            Err(ValidationError::UnexpectedIngress {
                group,
                port: PortRange::Tcp(defaults::EFS_PORT),
            })
        );
    }

    #[test]
    fn test_second_secret_is_rejected() {
        let mut graph = built();
        graph
            .add_resource(Resource::new(
                "ExtraSecret".into(),
                SecretProps {
                    description: String::new(),
                    template: BTreeMap::new(),
                    generate_key: "password".into(),
                    exclude_characters: String::new(),
                    password_length: 30,
                },
            ))
            .unwrap();
        assert_eq!(
            validate(&graph),
            Err(ValidationError::ResourceCount {
                kind: "AWS::SecretsManager::Secret".into(),
                found: 2,
            })
        );
    }

    #[test]
    fn test_private_subnet_routed_to_other_zone_is_rejected() {
        let mut graph = built();
        let subnet = LogicalId::new("VpcPrivateSubnet1");
        let foreign = LogicalId::new("VpcPublicSubnet2NatInstance");
        graph
            .modify(&subnet, |props| match props {
                ResourceProps::Subnet(p) => {
                    p.egress = Egress::Nat(foreign.clone());
                    Ok(())
                }
                _ => Err(GraphError::ResourceNotFound(subnet.clone())),
            })
            .unwrap();
        assert_eq!(validate(&graph), Err(ValidationError::MissingEgress { subnet }));
    }

    #[test]
    fn test_extra_nat_instance_is_rejected() {
        let mut graph = built();
        graph
            .add_resource(Resource::new(
                "ExtraNatInstance".into(),
                NatInstanceProps {
                    provider: "NatProvider".into(),
                    subnet: "VpcPublicSubnet1".into(),
                    security_group: "NatProviderSecurityGroup".into(),
                },
            ))
            .unwrap();
        assert_eq!(
            validate(&graph),
            Err(ValidationError::NatInstanceCount { expected: 2, found: 3 })
        );
    }

    #[test]
    fn test_ingress_from_restricted_group_needs_egress() {
        let mut graph = built();
        let lb_group = LogicalId::new("FargateServiceLBSecurityGroup");
        let db_group = database_group(&graph);
        graph
            .grant(Grant::Ingress {
                group: db_group.clone(),
                peer: Peer::SecurityGroup(lb_group.clone()),
                port: PortRange::Tcp(defaults::DB_PORT),
            })
            .unwrap();
        // the database check runs first and would report the extra rule
        let result = validate_peer_egress(&graph);
        assert_eq!(
            result,
            Err(ValidationError::UnreachablePeer {
                source_group: db_group,
                peer: lb_group,
                port: PortRange::Tcp(defaults::DB_PORT),
            })
        );
    }

    #[test]
    fn test_mask_range() {
        let id = LogicalId::new("Subnet");
        assert!(check_mask(&id, &"10.0.0.0/24".parse().unwrap()).is_ok());
        assert!(matches!(
            check_mask(&id, &"10.0.0.0/30".parse().unwrap()),
            Err(ValidationError::SubnetMask { mask: 30, .. })
        ));
    }
}

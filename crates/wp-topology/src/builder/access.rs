//! Cross-resource access grants
//!
//! Grants are additive and have set semantics; running this stage twice
//! leaves the graph unchanged.

use super::compute::Compute;
use super::data::{Database, SharedStorage};
use super::network::Network;
use crate::defaults;
use crate::error::BuildError;
use crate::graph::{Grant, ResourceGraph};
use crate::types::{Peer, PortRange};

/// IAM actions behind a filesystem root-access grant
pub const ROOT_ACCESS_ACTIONS: [&str; 2] =
    [defaults::EFS_ACTION_ROOT_ACCESS, defaults::EFS_ACTION_WRITE];

pub fn grant_all(
    graph: &mut ResourceGraph,
    network: &Network,
    database: &Database,
    storage: &SharedStorage,
    compute: &Compute,
) -> Result<(), BuildError> {
    let service = Peer::SecurityGroup(compute.service_security_group.clone());

    let grants = [
        // NAT instances forward anything originating inside the VPC
        Grant::Ingress {
            group: network.nat_security_group.clone(),
            peer: Peer::Ipv4(network.cidr),
            port: PortRange::AllTraffic,
        },
        Grant::Ingress {
            group: database.security_group.clone(),
            peer: service.clone(),
            port: PortRange::Tcp(database.port),
        },
        Grant::Iam {
            principal: compute.task_role.clone(),
            resource: storage.file_system.clone(),
            actions: ROOT_ACCESS_ACTIONS.iter().map(|a| (*a).to_string()).collect(),
        },
        Grant::Ingress {
            group: storage.security_group.clone(),
            peer: service,
            port: PortRange::Tcp(defaults::EFS_PORT),
        },
    ];

    let mut added = 0usize;
    for grant in grants {
        if graph.grant(grant)? {
            added += 1;
        }
    }
    tracing::debug!(added, "access grants applied");
    Ok(())
}

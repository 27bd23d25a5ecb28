//! Testing utilities for the WordPress stack workspace
//!
//! Shared fixtures: a lookup context with one hosted zone and one NAT image,
//! matching configurations, and small graph queries.

#![allow(missing_docs)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use wp_topology::builder::build_topology;
use wp_topology::config::DeploymentConfig;
use wp_topology::context::{MachineImage, StaticContext};
use wp_topology::defaults;
use wp_topology::graph::ResourceGraph;
use wp_topology::resource::{Resource, ResourceKind, ResourceProps};
use wp_topology::types::LogicalId;

pub const TEST_DOMAIN: &str = "example.com";
pub const TEST_ZONE_ID: &str = "Z0EXAMPLE123";
pub const TEST_REGION: &str = "us-east-1";
pub const TEST_IMAGE_ID: &str = "ami-0fcknat0arm64";

pub fn nat_image() -> MachineImage {
    MachineImage {
        image_id: TEST_IMAGE_ID.to_string(),
        name: "fck-nat-amzn2-hvm-1.3.0-20240125-arm64-ebs".to_string(),
        owner: defaults::NAT_IMAGE_OWNER.to_string(),
        creation_date: "2024-01-25T00:00:00.000Z".to_string(),
    }
}

/// Context that satisfies every lookup for [`example_config`].
pub fn example_context() -> StaticContext {
    StaticContext::new()
        .with_hosted_zone(TEST_DOMAIN, TEST_ZONE_ID)
        .with_machine_image(TEST_REGION, nat_image())
        .with_availability_zones(TEST_REGION, &["us-east-1a", "us-east-1b", "us-east-1c"])
}

pub fn example_config() -> DeploymentConfig {
    DeploymentConfig::from_pairs([
        ("REGION", TEST_REGION),
        ("DOMAIN", TEST_DOMAIN),
        ("DATABASE_NAME", "db"),
        ("DATABASE_USER", "admin"),
    ])
}

pub fn config_with(overrides: &[(&str, &str)]) -> DeploymentConfig {
    let mut map = example_config().to_map();
    for (key, value) in overrides {
        map.insert((*key).to_string(), (*value).to_string());
    }
    DeploymentConfig::from_map(&map)
}

pub fn build_example() -> ResourceGraph {
    build_topology(&example_config(), &example_context()).unwrap()
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// The single resource of `kind`; panics when there is not exactly one.
pub fn only_of_kind(graph: &ResourceGraph, kind: ResourceKind) -> &Resource {
    let mut found = graph.resources_of_kind(kind);
    let first = found.next().unwrap_or_else(|| panic!("no {kind:?} in graph"));
    assert!(found.next().is_none(), "more than one {kind:?} in graph");
    first
}

pub fn resource<'a>(graph: &'a ResourceGraph, id: &str) -> &'a Resource {
    graph
        .resource(&LogicalId::new(id))
        .unwrap_or_else(|| panic!("resource {id} not declared"))
}

pub fn ids_of_kind(graph: &ResourceGraph, kind: ResourceKind) -> Vec<LogicalId> {
    graph.resources_of_kind(kind).map(|r| r.id.clone()).collect()
}

/// Position of every resource in the creation order.
pub fn creation_positions(graph: &ResourceGraph) -> std::collections::HashMap<LogicalId, usize> {
    graph
        .topological_order()
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect()
}

pub fn database_security_group(graph: &ResourceGraph) -> LogicalId {
    match &only_of_kind(graph, ResourceKind::DatabaseInstance).props {
        ResourceProps::DatabaseInstance(db) => db.security_group.clone(),
        _ => unreachable!(),
    }
}

pub fn service_security_group(graph: &ResourceGraph) -> LogicalId {
    match &only_of_kind(graph, ResourceKind::Service).props {
        ResourceProps::Service(service) => service.security_group.clone(),
        _ => unreachable!(),
    }
}

//! Topology Builder
//!
//! One linear pass over the deployment, split by resource category. Each
//! stage declares its resources and hands back only the identifiers later
//! stages need:
//!
//! 1. [`edge`]: hosted zone lookup and certificate request
//! 2. [`network`]: NAT provider, VPC, subnets, NAT instances
//! 3. [`data`]: credential secret, database, shared filesystem
//! 4. [`compute`]: load-balanced container service, volume, redirect
//! 5. [`edge`]: alias record
//! 6. [`access`]: security-group and IAM grants
//!
//! Any failure drops the partially built graph; callers only ever see a
//! complete, validated [`ResourceGraph`].

pub mod access;
pub mod compute;
pub mod data;
pub mod edge;
pub mod network;

use crate::config::DeploymentConfig;
use crate::context::ContextProvider;
use crate::defaults;
use crate::error::{BuildError, SpecificationError};
use crate::graph::ResourceGraph;
use crate::validate;

/// Builds the resource graph for one deployment
pub struct TopologyBuilder<'a> {
    config: &'a DeploymentConfig,
    context: &'a dyn ContextProvider,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(config: &'a DeploymentConfig, context: &'a dyn ContextProvider) -> Self {
        Self { config, context }
    }

    /// Run every construction step in dependency order.
    pub fn build(&self) -> Result<ResourceGraph, BuildError> {
        let span = tracing::info_span!(
            "build_topology",
            domain = %self.config.domain,
            region = %self.config.region,
        );
        let _guard = span.enter();

        check_port_plan(&[
            ("https listener", defaults::HTTPS_PORT),
            ("redirect listener", defaults::HTTP_PORT),
        ])?;
        check_port_plan(&[
            ("container", defaults::CONTAINER_PORT),
            ("database", defaults::DB_PORT),
            ("filesystem", defaults::EFS_PORT),
        ])?;

        let config = self.config;
        let mut graph = ResourceGraph::new();

        let dns = edge::lookup_zone(&mut graph, config, self.context)?;
        let certificate = edge::request_certificate(&mut graph, config, &dns)?;

        let network = network::build(&mut graph, config, self.context)?;
        tracing::debug!(vpc = %network.vpc, zones = network.availability_zones.len(), "network declared");

        let credentials = data::build_secret(&mut graph, config)?;
        let database = data::build_database(&mut graph, config, &network, &credentials)?;
        let storage = data::build_filesystem(&mut graph, &network)?;

        let compute =
            compute::build_service(&mut graph, config, &network, &database, &credentials, &certificate)?;
        compute::attach_volume(&mut graph, &compute, &storage)?;
        compute::add_redirect_listener(&mut graph, config, &compute)?;
        compute::set_deregistration_delay(&mut graph, &compute)?;

        edge::alias_record(&mut graph, config, &dns, &compute)?;

        access::grant_all(&mut graph, &network, &database, &storage, &compute)?;

        let report = validate::validate(&graph)?;
        tracing::info!(
            resources = report.resource_count,
            edges = report.edge_count,
            grants = report.grant_count,
            fingerprint = %report.fingerprint,
            "topology built"
        );
        Ok(graph)
    }
}

/// Build the graph for `config` in one call.
pub fn build_topology(
    config: &DeploymentConfig,
    context: &dyn ContextProvider,
) -> Result<ResourceGraph, BuildError> {
    TopologyBuilder::new(config, context).build()
}

/// Reject two consumers of the same port inside one perimeter.
pub fn check_port_plan(ports: &[(&str, u16)]) -> Result<(), SpecificationError> {
    for (i, (first, port)) in ports.iter().enumerate() {
        if let Some((second, _)) = ports[i + 1..].iter().find(|(_, p)| p == port) {
            return Err(SpecificationError::PortCollision {
                port: *port,
                first: (*first).to_string(),
                second: (*second).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_plan_accepts_distinct_ports() {
        assert!(check_port_plan(&[("a", 80), ("b", 443), ("c", 8080)]).is_ok());
    }

    #[test]
    fn test_port_plan_reports_collision() {
        let err = check_port_plan(&[("container", 3306), ("database", 3306)]).unwrap_err();
        assert_eq!(
            err,
            SpecificationError::PortCollision {
                port: 3306,
                first: "container".into(),
                second: "database".into(),
            }
        );
    }
}

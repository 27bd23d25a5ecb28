//! DNS edge: hosted zone, certificate, alias record

use super::compute::Compute;
use crate::config::DeploymentConfig;
use crate::context::ContextProvider;
use crate::error::BuildError;
use crate::graph::ResourceGraph;
use crate::resource::{AliasRecordProps, CertificateProps, HostedZoneProps, Resource};
use crate::types::{Attribute, LogicalId, Value};

#[derive(Debug, Clone)]
pub struct Dns {
    pub zone: LogicalId,
    pub zone_name: String,
}

/// Import the pre-existing zone for the configured domain.
pub fn lookup_zone(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    context: &dyn ContextProvider,
) -> Result<Dns, BuildError> {
    let found = context.hosted_zone(&config.domain)?;
    tracing::debug!(domain = %config.domain, zone_id = %found.zone_id, "hosted zone resolved");

    let zone = graph.add_resource(Resource::new(
        LogicalId::new("Domain"),
        HostedZoneProps {
            zone_id: found.zone_id,
            zone_name: found.name.clone(),
        },
    ))?;
    Ok(Dns {
        zone,
        zone_name: found.name,
    })
}

/// Certificate for the apex plus the wildcard, validated through DNS.
pub fn request_certificate(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    dns: &Dns,
) -> Result<LogicalId, BuildError> {
    let subject_alternative_names = config.wildcard_domain().into_iter().collect();
    let certificate = graph.add_resource(Resource::new(
        LogicalId::new("Certificate"),
        CertificateProps {
            domain_name: config.domain.clone(),
            subject_alternative_names,
            validation_zone: dns.zone.clone(),
        },
    ))?;
    Ok(certificate)
}

/// Point the apex at the load balancer.
pub fn alias_record(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    dns: &Dns,
    compute: &Compute,
) -> Result<LogicalId, BuildError> {
    let record = graph.add_resource(Resource::new(
        LogicalId::new("AliasRecord"),
        AliasRecordProps {
            zone: dns.zone.clone(),
            record_name: config.domain.clone(),
            target_dns: Value::attr(&compute.load_balancer, Attribute::DnsName),
            target_zone_id: Value::attr(&compute.load_balancer, Attribute::CanonicalHostedZoneId),
        },
    ))?;
    Ok(record)
}

//! Network foundation: NAT provider, VPC, internet gateway, subnets and the
//! NAT instances private subnets route through

use crate::config::DeploymentConfig;
use crate::context::{ContextProvider, ImageQuery};
use crate::defaults;
use crate::error::{BuildError, GraphError, LookupError};
use crate::graph::ResourceGraph;
use crate::resource::{
    Egress, InternetGatewayProps, NatInstanceProps, NatProviderProps, Resource, SecurityGroupProps,
    SubnetProps, VpcProps,
};
use crate::types::{Cidr, LogicalId, SubnetType};

/// Identifiers the later stages need from the network
#[derive(Debug, Clone)]
pub struct Network {
    pub vpc: LogicalId,
    pub cidr: Cidr,
    pub nat_provider: LogicalId,
    pub nat_security_group: LogicalId,
    pub availability_zones: Vec<String>,
    /// One per availability zone, in zone order.
    pub public_subnets: Vec<LogicalId>,
    /// One per availability zone, in zone order.
    pub private_subnets: Vec<LogicalId>,
}

pub fn build(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    context: &dyn ContextProvider,
) -> Result<Network, BuildError> {
    let image = context.machine_image(
        &config.region,
        &ImageQuery {
            name_pattern: defaults::NAT_IMAGE_NAME_PATTERN.to_string(),
            owners: vec![defaults::NAT_IMAGE_OWNER.to_string()],
        },
    )?;

    let mut zones = context.availability_zones(&config.region)?;
    if zones.len() < defaults::MAX_AZS {
        return Err(LookupError::InsufficientAvailabilityZones {
            region: config.region.clone(),
            found: zones.len(),
            required: defaults::MAX_AZS,
        }
        .into());
    }
    zones.truncate(defaults::MAX_AZS);

    // Declared first: the VPC names it as the egress provider
    let nat_provider = graph.add_resource(Resource::new(
        LogicalId::new("NatProvider"),
        NatProviderProps {
            instance_type: defaults::NAT_INSTANCE_TYPE.to_string(),
            image_id: image.image_id,
            image_name: image.name,
            instances: defaults::NAT_GATEWAYS.min(zones.len()),
            source_dest_check: false,
        },
    ))?;

    let cidr: Cidr = defaults::VPC_CIDR.parse()?;
    let vpc = graph.add_resource(Resource::new(
        LogicalId::from_name(&config.vpc_name),
        VpcProps {
            name: config.vpc_name.clone(),
            cidr,
            max_azs: defaults::MAX_AZS,
            nat_gateways: defaults::NAT_GATEWAYS,
            nat_provider: nat_provider.clone(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
        },
    ))?;

    let igw = graph.add_resource(Resource::new(
        vpc.child("IGW"),
        InternetGatewayProps { vpc: vpc.clone() },
    ))?;

    // Public blocks first, then private, each /24 in zone order
    let mut public_subnets = Vec::with_capacity(zones.len());
    let mut private_subnets = Vec::with_capacity(zones.len());
    let mut block = 0u32;
    for (i, zone) in zones.iter().enumerate() {
        let subnet = graph.add_resource(Resource::new(
            vpc.child(&format!("PublicSubnet{}", i + 1)),
            SubnetProps {
                vpc: vpc.clone(),
                availability_zone: zone.clone(),
                subnet_type: SubnetType::Public,
                cidr: cidr.subnet(defaults::SUBNET_CIDR_MASK, block)?,
                map_public_ip_on_launch: true,
                egress: Egress::InternetGateway(igw.clone()),
            },
        ))?;
        block += 1;
        public_subnets.push(subnet);
    }

    let nat_security_group = graph.add_resource(Resource::new(
        nat_provider.child("SecurityGroup"),
        SecurityGroupProps {
            description: "Security Group for NAT instances".to_string(),
            vpc: vpc.clone(),
            allow_all_outbound: true,
        },
    ))?;

    let served = defaults::NAT_GATEWAYS.min(public_subnets.len());
    let mut nat_instances = Vec::with_capacity(served);
    for subnet in public_subnets.iter().take(served) {
        let instance = graph.add_resource(Resource::new(
            subnet.child("NatInstance"),
            NatInstanceProps {
                provider: nat_provider.clone(),
                subnet: subnet.clone(),
                security_group: nat_security_group.clone(),
            },
        ))?;
        nat_instances.push(instance);
    }

    for (i, zone) in zones.iter().enumerate() {
        // Zones without their own instance share the last one
        let nat = nat_instances
            .get(i)
            .or_else(|| nat_instances.last())
            .cloned()
            .ok_or_else(|| GraphError::ResourceNotFound(nat_provider.child("NatInstance")))?;
        let subnet = graph.add_resource(Resource::new(
            vpc.child(&format!("PrivateSubnet{}", i + 1)),
            SubnetProps {
                vpc: vpc.clone(),
                availability_zone: zone.clone(),
                subnet_type: SubnetType::PrivateWithEgress,
                cidr: cidr.subnet(defaults::SUBNET_CIDR_MASK, block)?,
                map_public_ip_on_launch: false,
                egress: Egress::Nat(nat),
            },
        ))?;
        block += 1;
        private_subnets.push(subnet);
    }

    tracing::debug!(nat_instances = nat_instances.len(), "network declared");

    Ok(Network {
        vpc,
        cidr,
        nat_provider,
        nat_security_group,
        availability_zones: zones,
        public_subnets,
        private_subnets,
    })
}

//! Load-balanced container service
//!
//! Mirrors the usual "application load balanced Fargate service" shape: a
//! public load balancer with an HTTPS listener forwarding to an IP target
//! group, and a service running in the private subnets.

use super::data::{Credentials, Database, SharedStorage};
use super::network::Network;
use crate::config::DeploymentConfig;
use crate::defaults;
use crate::error::{BuildError, GraphError};
use crate::graph::{Grant, ResourceGraph};
use crate::resource::{
    CapacityProviderStrategy, ClusterProps, ContainerDefinition, EfsVolumeConfiguration,
    ListenerAction, ListenerProps, LoadBalancerProps, LogGroupProps, MountPoint, Protocol,
    RedirectAction, Resource, ResourceProps, RoleProps, SecurityGroupProps, ServiceLoadBalancer,
    ServiceProps, TargetGroupProps, TaskDefinitionProps, Volume,
};
use crate::types::{Attribute, LogicalId, Peer, PortRange, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Compute {
    pub cluster: LogicalId,
    pub load_balancer: LogicalId,
    pub load_balancer_security_group: LogicalId,
    pub https_listener: LogicalId,
    pub target_group: LogicalId,
    pub task_definition: LogicalId,
    pub task_role: LogicalId,
    pub execution_role: LogicalId,
    pub log_group: LogicalId,
    pub service: LogicalId,
    pub service_security_group: LogicalId,
}

/// Container environment: database wiring plus fixed PHP limits.
fn container_environment(
    config: &DeploymentConfig,
    database: &Database,
    credentials: &Credentials,
) -> BTreeMap<String, Value> {
    let mut env = BTreeMap::new();
    env.insert(
        "MARIADB_HOST".to_string(),
        Value::attr(&database.instance, Attribute::EndpointAddress),
    );
    env.insert(
        "WORDPRESS_DATABASE_USER".to_string(),
        Value::literal(config.database_user.as_str()),
    );
    env.insert("WORDPRESS_DATABASE_PASSWORD".to_string(), credentials.password());
    env.insert(
        "WORDPRESS_DATABASE_NAME".to_string(),
        Value::literal(database.database_name.as_str()),
    );
    env.insert(
        "PHP_MEMORY_LIMIT".to_string(),
        Value::literal(defaults::PHP_MEMORY_LIMIT),
    );
    env.insert("enabled".to_string(), Value::literal("false"));
    env
}

pub fn build_service(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    network: &Network,
    database: &Database,
    credentials: &Credentials,
    certificate: &LogicalId,
) -> Result<Compute, BuildError> {
    let id = LogicalId::new("FargateService");

    let cluster = graph.add_resource(Resource::new(
        LogicalId::new("EcsDefaultCluster"),
        ClusterProps {
            vpc: network.vpc.clone(),
        },
    ))?;

    let lb = id.child("LB");
    let load_balancer_security_group = graph.add_resource(Resource::new(
        lb.child("SecurityGroup"),
        SecurityGroupProps {
            description: "Security group for the public load balancer".to_string(),
            vpc: network.vpc.clone(),
            allow_all_outbound: false,
        },
    ))?;
    let load_balancer = graph.add_resource(Resource::new(
        lb,
        LoadBalancerProps {
            internet_facing: true,
            subnets: network.public_subnets.clone(),
            security_group: load_balancer_security_group.clone(),
        },
    ))?;

    let listener_id = load_balancer.child("PublicListener");
    let target_group = graph.add_resource(Resource::new(
        listener_id.child("ECSGroup"),
        TargetGroupProps {
            vpc: network.vpc.clone(),
            port: defaults::CONTAINER_PORT,
            protocol: Protocol::Http,
            target_type: "ip".to_string(),
            attributes: BTreeMap::new(),
        },
    ))?;
    let https_listener = graph.add_resource(Resource::new(
        listener_id,
        ListenerProps {
            load_balancer: load_balancer.clone(),
            port: defaults::HTTPS_PORT,
            protocol: Protocol::Https,
            certificates: vec![certificate.clone()],
            default_action: ListenerAction::Forward {
                target_group: target_group.clone(),
            },
        },
    ))?;

    let task_def_id = id.child("TaskDef");
    let task_role = graph.add_resource(Resource::new(
        task_def_id.child("TaskRole"),
        RoleProps {
            assumed_by: defaults::TASK_ROLE_PRINCIPAL.to_string(),
            description: "Role assumed by the running WordPress task".to_string(),
        },
    ))?;
    let execution_role = graph.add_resource(Resource::new(
        task_def_id.child("ExecutionRole"),
        RoleProps {
            assumed_by: defaults::TASK_ROLE_PRINCIPAL.to_string(),
            description: "Role used by the agent to pull images and ship logs".to_string(),
        },
    ))?;
    let log_group = graph.add_resource(Resource::new(
        task_def_id.child(&format!("{}LogGroup", defaults::CONTAINER_NAME)),
        LogGroupProps {
            retention_days: None,
        },
    ))?;

    let container = ContainerDefinition {
        name: defaults::CONTAINER_NAME.to_string(),
        image: defaults::CONTAINER_IMAGE.to_string(),
        essential: true,
        port_mappings: vec![defaults::CONTAINER_PORT],
        environment: container_environment(config, database, credentials),
        log_group: Some(log_group.clone()),
        mount_points: Vec::new(),
    };
    let task_definition = graph.add_resource(Resource::new(
        task_def_id,
        TaskDefinitionProps {
            cpu: defaults::TASK_CPU,
            memory_mib: defaults::TASK_MEMORY_MIB,
            network_mode: "awsvpc".to_string(),
            requires_compatibilities: vec!["FARGATE".to_string()],
            task_role: task_role.clone(),
            execution_role: execution_role.clone(),
            containers: vec![container],
            volumes: Vec::new(),
        },
    ))?;

    let service_security_group = graph.add_resource(Resource::new(
        id.child("ServiceSecurityGroup"),
        SecurityGroupProps {
            description: "Security group for the WordPress tasks".to_string(),
            vpc: network.vpc.clone(),
            allow_all_outbound: true,
        },
    ))?;

    let service = graph.add_resource(
        Resource::new(
            id.child("Service"),
            ServiceProps {
                cluster: cluster.clone(),
                task_definition: task_definition.clone(),
                desired_count: defaults::DESIRED_COUNT,
                capacity_provider_strategies: vec![CapacityProviderStrategy {
                    capacity_provider: defaults::CAPACITY_PROVIDER.to_string(),
                    base: defaults::CAPACITY_BASE,
                    weight: defaults::CAPACITY_WEIGHT,
                }],
                subnets: network.private_subnets.clone(),
                security_group: service_security_group.clone(),
                assign_public_ip: false,
                enable_execute_command: defaults::ENABLE_EXECUTE_COMMAND,
                health_check_grace_period_secs: 60,
                load_balancer: ServiceLoadBalancer {
                    target_group: target_group.clone(),
                    container_name: defaults::CONTAINER_NAME.to_string(),
                    container_port: defaults::CONTAINER_PORT,
                },
            },
        )
        // targets can only register once the listener exists
        .depends_on(&https_listener),
    )?;

    // Pattern-level wiring: world -> LB on 443, LB -> tasks on the container port
    graph.grant(Grant::Ingress {
        group: load_balancer_security_group.clone(),
        peer: Peer::AnyIpv4,
        port: PortRange::Tcp(defaults::HTTPS_PORT),
    })?;
    graph.grant(Grant::Ingress {
        group: service_security_group.clone(),
        peer: Peer::SecurityGroup(load_balancer_security_group.clone()),
        port: PortRange::Tcp(defaults::CONTAINER_PORT),
    })?;
    // The LB group starts with no outbound rules
    graph.grant(Grant::Egress {
        group: load_balancer_security_group.clone(),
        peer: Peer::SecurityGroup(service_security_group.clone()),
        port: PortRange::Tcp(defaults::CONTAINER_PORT),
    })?;
    graph.grant(Grant::Iam {
        principal: execution_role.clone(),
        resource: log_group.clone(),
        actions: vec![
            "logs:CreateLogStream".to_string(),
            "logs:PutLogEvents".to_string(),
        ],
    })?;

    Ok(Compute {
        cluster,
        load_balancer,
        load_balancer_security_group,
        https_listener,
        target_group,
        task_definition,
        task_role,
        execution_role,
        log_group,
        service,
        service_security_group,
    })
}

/// Mount the access point into the container.
///
/// Authorization rides on the access point's POSIX identity, so IAM
/// authorization stays disabled while transit encryption is on.
pub fn attach_volume(
    graph: &mut ResourceGraph,
    compute: &Compute,
    storage: &SharedStorage,
) -> Result<(), BuildError> {
    graph.modify(&compute.task_definition, |props| {
        let ResourceProps::TaskDefinition(task) = props else {
            return Err(unexpected_kind(&compute.task_definition, "task definition"));
        };
        let volume = Volume {
            name: defaults::VOLUME_NAME.to_string(),
            efs: EfsVolumeConfiguration {
                file_system: storage.file_system.clone(),
                access_point: storage.access_point.clone(),
                transit_encryption: true,
                iam_authorization: false,
            },
        };
        if !task.volumes.contains(&volume) {
            task.volumes.push(volume);
        }
        let container = task
            .find_container_mut(defaults::CONTAINER_NAME)
            .ok_or_else(|| {
                GraphError::ResourceNotFound(compute.task_definition.child(defaults::CONTAINER_NAME))
            })?;
        let mount = MountPoint {
            container_path: defaults::CONTAINER_MOUNT_PATH.to_string(),
            source_volume: defaults::VOLUME_NAME.to_string(),
            read_only: false,
        };
        if !container.mount_points.contains(&mount) {
            container.mount_points.push(mount);
        }
        Ok(())
    })?;
    Ok(())
}

fn unexpected_kind(id: &LogicalId, expected: &str) -> GraphError {
    GraphError::UnexpectedKind {
        id: id.clone(),
        expected: expected.to_string(),
    }
}

/// Port 80 exists only to bounce clients to HTTPS on the configured domain.
pub fn add_redirect_listener(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    compute: &Compute,
) -> Result<LogicalId, BuildError> {
    let listener = graph.add_resource(Resource::new(
        compute.load_balancer.child("PortEightyListener"),
        ListenerProps {
            load_balancer: compute.load_balancer.clone(),
            port: defaults::HTTP_PORT,
            protocol: Protocol::Http,
            certificates: Vec::new(),
            default_action: ListenerAction::Redirect(RedirectAction::to_https(
                &config.domain,
                defaults::HTTPS_PORT,
            )),
        },
    ))?;
    graph.grant(Grant::Ingress {
        group: compute.load_balancer_security_group.clone(),
        peer: Peer::AnyIpv4,
        port: PortRange::Tcp(defaults::HTTP_PORT),
    })?;
    Ok(listener)
}

pub fn set_deregistration_delay(
    graph: &mut ResourceGraph,
    compute: &Compute,
) -> Result<(), BuildError> {
    graph.modify(&compute.target_group, |props| {
        let ResourceProps::TargetGroup(tg) = props else {
            return Err(unexpected_kind(&compute.target_group, "target group"));
        };
        tg.attributes.insert(
            defaults::DEREGISTRATION_DELAY_ATTRIBUTE.to_string(),
            defaults::DEREGISTRATION_DELAY_SECS.to_string(),
        );
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_topology;
    use crate::context::{MachineImage, StaticContext};

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

    /// Every handle points at one log group.
    fn misdirected(graph: &mut ResourceGraph) -> Compute {
        let logs = graph
            .add_resource(Resource::new("Logs".into(), LogGroupProps { retention_days: None }))
            .unwrap();
        Compute {
            cluster: logs.clone(),
            load_balancer: logs.clone(),
            load_balancer_security_group: logs.clone(),
            https_listener: logs.clone(),
            target_group: logs.clone(),
            task_definition: logs.clone(),
            task_role: logs.clone(),
            execution_role: logs.clone(),
            log_group: logs.clone(),
            service: logs.clone(),
            service_security_group: logs,
        }
    }

    #[test]
    fn test_load_balancer_egress_reaches_service_port() {
        let graph = built();
        let lb_group = LogicalId::new("FargateServiceLBSecurityGroup");
        let service_group = LogicalId::new("FargateServiceServiceSecurityGroup");

        assert_eq!(
            graph.egress_rules(&lb_group),
            vec![(
                &Peer::SecurityGroup(service_group.clone()),
                PortRange::Tcp(defaults::CONTAINER_PORT)
            )]
        );
        assert!(graph.egress_rules(&service_group).is_empty());
    }

    #[test]
    fn test_deregistration_delay_on_wrong_kind_is_an_error() {
        let mut graph = ResourceGraph::new();
        let compute = misdirected(&mut graph);
        let fingerprint = graph.fingerprint();

        let result = set_deregistration_delay(&mut graph, &compute);
        assert!(matches!(
            result,
            Err(BuildError::Graph(GraphError::UnexpectedKind { ref id, .. })) if id.as_str() == "Logs"
        ));
        assert_eq!(graph.fingerprint(), fingerprint);
    }

    #[test]
    fn test_attach_volume_on_wrong_kind_is_an_error() {
        let mut graph = ResourceGraph::new();
        let compute = misdirected(&mut graph);
        let storage = SharedStorage {
            file_system: "Logs".into(),
            security_group: "Logs".into(),
            mount_targets: Vec::new(),
            access_point: "Logs".into(),
        };

        let result = attach_volume(&mut graph, &compute, &storage);
        assert!(matches!(
            result,
            Err(BuildError::Graph(GraphError::UnexpectedKind { .. }))
        ));
    }

    #[test]
    fn test_attach_volume_is_idempotent() {
        let mut graph = built();
        let task = LogicalId::new("FargateServiceTaskDef");
        let before = graph.resource(&task).cloned().unwrap();
        let storage = SharedStorage {
            file_system: "FileSystem".into(),
            security_group: "FileSystemEfsSecurityGroup".into(),
            mount_targets: Vec::new(),
            access_point: "WordpressAccessPoint".into(),
        };
        let compute = Compute {
            cluster: "EcsDefaultCluster".into(),
            load_balancer: "FargateServiceLB".into(),
            load_balancer_security_group: "FargateServiceLBSecurityGroup".into(),
            https_listener: "FargateServiceLBPublicListener".into(),
            target_group: "FargateServiceLBPublicListenerECSGroup".into(),
            task_definition: task.clone(),
            task_role: task.child("TaskRole"),
            execution_role: task.child("ExecutionRole"),
            log_group: task.child(&format!("{}LogGroup", defaults::CONTAINER_NAME)),
            service: "FargateServiceService".into(),
            service_security_group: "FargateServiceServiceSecurityGroup".into(),
        };

        attach_volume(&mut graph, &compute, &storage).unwrap();
        assert_eq!(graph.resource(&task), Some(&before));
    }
}

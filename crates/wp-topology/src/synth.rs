//! Template Synthesis
//!
//! Renders a [`ResourceGraph`] as a CloudFormation-style JSON template.
//!
//! - identifier links become `{"Ref": id}`
//! - attribute references become `{"Fn::GetAtt": [id, attribute]}`
//! - secret fields become `{{resolve:secretsmanager:...}}` dynamic references
//!   joined around a `Ref` to the secret
//! - references with no rendered form become `DependsOn` entries
//! - grants become standalone ingress, egress and policy resources
//!
//! Imported resources (the hosted zone) are not emitted; references to them
//! render as their looked-up identifier. Configuration-only resources (the
//! NAT provider) are folded into the resources that use them. Object keys are
//! sorted, so the same graph always yields byte-identical output.

use crate::graph::{Grant, ResourceGraph};
use crate::resource::{
    Effect, Egress, ListenerAction, PolicyStatement, Principal, Resource, ResourceProps,
};
use crate::types::{Attribute, LogicalId, Peer, PortRange, RemovalPolicy, Value};
use serde_json::{json, Map, Value as Json};
use std::collections::{BTreeMap, HashSet};

const TEMPLATE_VERSION: &str = "2010-09-09";
const POLICY_VERSION: &str = "2012-10-17";

/// Render the whole graph.
pub fn synthesize(graph: &ResourceGraph) -> Json {
    Synthesizer::new(graph).run()
}

struct Synthesizer<'a> {
    graph: &'a ResourceGraph,
    resources: Map<String, Json>,
}

impl<'a> Synthesizer<'a> {
    fn new(graph: &'a ResourceGraph) -> Self {
        Self {
            graph,
            resources: Map::new(),
        }
    }

    fn run(mut self) -> Json {
        let graph = self.graph;
        let mut imports = Map::new();
        let mut outputs = Map::new();

        for resource in graph.resources() {
            if resource.kind().is_imported() {
                imports.insert(
                    resource.id.to_string(),
                    json!({
                        "Type": resource.kind().type_name(),
                        "Id": self.reference(&resource.id),
                    }),
                );
                continue;
            }
            if resource.kind().is_config_only() {
                continue;
            }
            let properties = self.properties(resource);
            self.emit(resource, properties);
            self.emit_companions(resource);

            if let ResourceProps::LoadBalancer(_) = resource.props {
                outputs.insert(
                    format!("{}DNS", resource.id),
                    json!({ "Value": self.attr(&resource.id, Attribute::DnsName) }),
                );
            }
        }
        self.emit_grants();

        json!({
            "AWSTemplateFormatVersion": TEMPLATE_VERSION,
            "Metadata": {
                "Fingerprint": graph.fingerprint(),
                "Imports": imports,
            },
            "Resources": self.resources,
            "Outputs": outputs,
        })
    }

    fn emit(&mut self, resource: &Resource, properties: Json) {
        // Explicit ordering first, then references the properties never render
        let depends_on: Vec<String> = {
            let mut mentioned = HashSet::new();
            collect_mentions(&properties, &mut mentioned);
            let mut seen = HashSet::new();
            resource
                .depends_on
                .iter()
                .chain(
                    resource
                        .references()
                        .into_iter()
                        .filter(|id| !mentioned.contains(id.as_str())),
                )
                .filter(|id| self.is_provisioned(id) && seen.insert(*id))
                .map(LogicalId::to_string)
                .collect()
        };

        let mut entry = Map::new();
        entry.insert("Type".into(), json!(resource.kind().type_name()));
        entry.insert("Properties".into(), properties);
        if !depends_on.is_empty() {
            entry.insert("DependsOn".into(), json!(depends_on));
        }

        let policy = match resource.removal_policy {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Snapshot => "Snapshot",
        };
        entry.insert("DeletionPolicy".into(), json!(policy));
        entry.insert("UpdateReplacePolicy".into(), json!(policy));
        self.resources.insert(resource.id.to_string(), Json::Object(entry));
    }

    fn emit_raw(&mut self, id: String, type_name: &str, properties: Json) {
        self.resources
            .insert(id, json!({ "Type": type_name, "Properties": properties }));
    }

    /// Supporting resources the provisioning engine needs but the graph
    /// models as properties.
    fn emit_companions(&mut self, resource: &Resource) {
        match &resource.props {
            ResourceProps::InternetGateway(igw) => {
                let properties = json!({
                    "InternetGatewayId": self.reference(&resource.id),
                    "VpcId": self.reference(&igw.vpc),
                });
                self.emit_raw(
                    format!("{}Attachment", resource.id),
                    "AWS::EC2::VPCGatewayAttachment",
                    properties,
                );
            }
            ResourceProps::Subnet(subnet) => {
                let table = resource.id.child("RouteTable");
                let table_props = json!({ "VpcId": self.reference(&subnet.vpc) });
                let association = json!({
                    "RouteTableId": self.reference(&table),
                    "SubnetId": self.reference(&resource.id),
                });
                let target_key = match subnet.egress {
                    Egress::InternetGateway(_) => "GatewayId",
                    Egress::Nat(_) => "InstanceId",
                };
                let route = json!({
                    "RouteTableId": self.reference(&table),
                    "DestinationCidrBlock": "0.0.0.0/0",
                    target_key: self.reference(subnet.egress.target()),
                });
                self.emit_raw(table.to_string(), "AWS::EC2::RouteTable", table_props);
                self.emit_raw(
                    format!("{}RouteTableAssociation", resource.id),
                    "AWS::EC2::SubnetRouteTableAssociation",
                    association,
                );
                self.emit_raw(
                    format!("{}DefaultRoute", resource.id),
                    "AWS::EC2::Route",
                    route,
                );
            }
            ResourceProps::Service(service) => {
                let providers: Vec<&str> = service
                    .capacity_provider_strategies
                    .iter()
                    .map(|s| s.capacity_provider.as_str())
                    .collect();
                let properties = json!({
                    "Cluster": self.reference(&service.cluster),
                    "CapacityProviders": providers,
                    "DefaultCapacityProviderStrategy": [],
                });
                self.emit_raw(
                    format!("{}CapacityProviders", service.cluster),
                    "AWS::ECS::ClusterCapacityProviderAssociations",
                    properties,
                );
            }
            _ => {}
        }
    }

    fn emit_grants(&mut self) {
        let graph = self.graph;
        let mut policies: BTreeMap<&LogicalId, Vec<Json>> = BTreeMap::new();

        for grant in graph.grants() {
            match grant {
                Grant::Ingress { group, peer, port } => {
                    self.emit_rule(Direction::Ingress, group, peer, *port);
                }
                Grant::Egress { group, peer, port } => {
                    self.emit_rule(Direction::Egress, group, peer, *port);
                }
                Grant::Iam {
                    principal,
                    resource,
                    actions,
                } => {
                    policies.entry(principal).or_default().push(json!({
                        "Effect": "Allow",
                        "Action": actions,
                        "Resource": self.attr(resource, Attribute::Arn),
                    }));
                }
            }
        }

        for (principal, statements) in policies {
            let name = format!("{principal}DefaultPolicy");
            let properties = json!({
                "PolicyName": name,
                "PolicyDocument": { "Version": POLICY_VERSION, "Statement": statements },
                "Roles": [self.reference(principal)],
            });
            self.emit_raw(name, "AWS::IAM::Policy", properties);
        }
    }

    /// One standalone security-group rule.
    fn emit_rule(&mut self, direction: Direction, group: &LogicalId, peer: &Peer, port: PortRange) {
        let mut rule = Map::new();
        rule.insert("GroupId".into(), self.attr(group, Attribute::GroupId));
        let (protocol, from, to) = match port {
            PortRange::Tcp(p) => ("tcp", i32::from(p), i32::from(p)),
            PortRange::AllTraffic => ("-1", -1, -1),
        };
        rule.insert("IpProtocol".into(), json!(protocol));
        if protocol != "-1" {
            rule.insert("FromPort".into(), json!(from));
            rule.insert("ToPort".into(), json!(to));
        }
        let peer_tag = match peer {
            Peer::Ipv4(cidr) => {
                rule.insert("CidrIp".into(), json!(cidr.to_string()));
                cidr.to_string()
            }
            Peer::AnyIpv4 => {
                rule.insert("CidrIp".into(), json!("0.0.0.0/0"));
                "0.0.0.0/0".to_string()
            }
            Peer::SecurityGroup(other) => {
                rule.insert(
                    direction.peer_key().into(),
                    self.attr(other, Attribute::GroupId),
                );
                other.to_string()
            }
        };
        let preposition = direction.preposition();
        rule.insert(
            "Description".into(),
            json!(format!("{preposition} {peer_tag}:{port}")),
        );
        let id = LogicalId::from_name(&format!("{group}{preposition}{peer_tag}{port}"));
        self.emit_raw(id.to_string(), direction.type_name(), Json::Object(rule));
    }

    fn is_provisioned(&self, id: &LogicalId) -> bool {
        self.graph
            .resource(id)
            .is_some_and(|r| r.kind().is_provisioned())
    }

    fn reference(&self, id: &LogicalId) -> Json {
        match self.graph.resource(id).map(|r| &r.props) {
            Some(ResourceProps::HostedZone(zone)) => json!(zone.zone_id),
            _ => json!({ "Ref": id.as_str() }),
        }
    }

    fn attr(&self, id: &LogicalId, attribute: Attribute) -> Json {
        if attribute == Attribute::Id {
            self.reference(id)
        } else {
            json!({ "Fn::GetAtt": [id.as_str(), attribute.as_str()] })
        }
    }

    fn value(&self, value: &Value) -> Json {
        match value {
            Value::Literal(s) => json!(s),
            Value::Ref(r) => self.attr(&r.target, r.attribute),
            Value::SecretField { secret, field } => json!({
                "Fn::Join": ["", [
                    "{{resolve:secretsmanager:",
                    self.reference(secret),
                    format!(":SecretString:{field}::}}}}"),
                ]],
            }),
        }
    }

    fn group_ids(&self, groups: &[&LogicalId]) -> Json {
        Json::Array(
            groups
                .iter()
                .map(|g| self.attr(g, Attribute::GroupId))
                .collect(),
        )
    }

    fn refs(&self, ids: &[LogicalId]) -> Json {
        Json::Array(ids.iter().map(|id| self.reference(id)).collect())
    }

    fn statement(&self, statement: &PolicyStatement) -> Json {
        let principal = match &statement.principal {
            Principal::Any => json!({ "AWS": "*" }),
            Principal::Role(role) => json!({ "AWS": self.attr(role, Attribute::Arn) }),
        };
        let effect = match statement.effect {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        };
        let mut out = json!({
            "Effect": effect,
            "Action": statement.actions,
            "Principal": principal,
        });
        if !statement.conditions.is_empty() {
            out["Condition"] = json!(statement.conditions);
        }
        out
    }

    fn properties(&self, resource: &Resource) -> Json {
        match &resource.props {
            ResourceProps::HostedZone(p) => json!({ "Name": p.zone_name }),
            ResourceProps::Certificate(p) => json!({
                "DomainName": p.domain_name,
                "SubjectAlternativeNames": p.subject_alternative_names,
                "ValidationMethod": "DNS",
                "DomainValidationOptions": [{
                    "DomainName": p.domain_name,
                    "HostedZoneId": self.reference(&p.validation_zone),
                }],
            }),
            // folded into each NAT instance
            ResourceProps::NatProvider(_) => json!({}),
            ResourceProps::NatInstance(p) => {
                let mut out = json!({
                    "SubnetId": self.reference(&p.subnet),
                    "SecurityGroupIds": self.group_ids(&[&p.security_group]),
                    "Tags": [{ "Key": "Name", "Value": resource.id.as_str() }],
                });
                if let Some(ResourceProps::NatProvider(nat)) =
                    self.graph.resource(&p.provider).map(|r| &r.props)
                {
                    out["InstanceType"] = json!(nat.instance_type);
                    out["ImageId"] = json!(nat.image_id);
                    out["SourceDestCheck"] = json!(nat.source_dest_check);
                }
                out
            }
            ResourceProps::Vpc(p) => json!({
                "CidrBlock": p.cidr.to_string(),
                "EnableDnsHostnames": p.enable_dns_hostnames,
                "EnableDnsSupport": p.enable_dns_support,
                "Tags": [{ "Key": "Name", "Value": p.name }],
            }),
            ResourceProps::InternetGateway(_) => json!({}),
            ResourceProps::Subnet(p) => json!({
                "VpcId": self.reference(&p.vpc),
                "AvailabilityZone": p.availability_zone,
                "CidrBlock": p.cidr.to_string(),
                "MapPublicIpOnLaunch": p.map_public_ip_on_launch,
            }),
            ResourceProps::SecurityGroup(p) => {
                let egress = if p.allow_all_outbound {
                    json!([{ "CidrIp": "0.0.0.0/0", "IpProtocol": "-1" }])
                } else {
                    // placeholder rule that matches nothing
                    json!([{
                        "CidrIp": "255.255.255.255/32",
                        "IpProtocol": "icmp",
                        "FromPort": 252,
                        "ToPort": 86,
                        "Description": "Disallow all traffic",
                    }])
                };
                json!({
                    "GroupDescription": p.description,
                    "VpcId": self.reference(&p.vpc),
                    "SecurityGroupEgress": egress,
                })
            }
            ResourceProps::Secret(p) => {
                let template = serde_json::to_string(&p.template).unwrap_or_default();
                json!({
                    "Description": p.description,
                    "GenerateSecretString": {
                        "SecretStringTemplate": template,
                        "GenerateStringKey": p.generate_key,
                        "ExcludeCharacters": p.exclude_characters,
                        "PasswordLength": p.password_length,
                    },
                })
            }
            ResourceProps::DbSubnetGroup(p) => json!({
                "DBSubnetGroupDescription": p.description,
                "SubnetIds": self.refs(&p.subnets),
            }),
            ResourceProps::DatabaseInstance(p) => json!({
                "DBInstanceIdentifier": p.identifier,
                "DBName": p.database_name,
                "Engine": p.engine,
                "EngineVersion": p.engine_version,
                "DBInstanceClass": p.instance_class,
                "Port": p.port.to_string(),
                "AllocatedStorage": p.allocated_storage_gib.to_string(),
                "PubliclyAccessible": p.publicly_accessible,
                "MultiAZ": p.multi_az,
                "MasterUsername": self.value(&p.username),
                "MasterUserPassword": self.value(&p.password),
                "DBSubnetGroupName": self.reference(&p.subnet_group),
                "VPCSecurityGroups": self.group_ids(&[&p.security_group]),
            }),
            ResourceProps::FileSystem(p) => {
                let statements: Vec<Json> = p.policy.iter().map(|s| self.statement(s)).collect();
                json!({
                    "PerformanceMode": p.performance_mode,
                    "Encrypted": p.encrypted,
                    "FileSystemPolicy": { "Version": POLICY_VERSION, "Statement": statements },
                })
            }
            ResourceProps::MountTarget(p) => json!({
                "FileSystemId": self.reference(&p.file_system),
                "SubnetId": self.reference(&p.subnet),
                "SecurityGroups": self.group_ids(&[&p.security_group]),
            }),
            ResourceProps::AccessPoint(p) => json!({
                "FileSystemId": self.reference(&p.file_system),
                "RootDirectory": {
                    "Path": p.path,
                    "CreationInfo": {
                        "OwnerUid": p.create_acl.owner_uid.to_string(),
                        "OwnerGid": p.create_acl.owner_gid.to_string(),
                        "Permissions": p.create_acl.permissions,
                    },
                },
                "PosixUser": {
                    "Uid": p.posix_user.uid.to_string(),
                    "Gid": p.posix_user.gid.to_string(),
                },
            }),
            ResourceProps::Cluster(_) => json!({}),
            ResourceProps::LoadBalancer(p) => json!({
                "Type": "application",
                "Scheme": if p.internet_facing { "internet-facing" } else { "internal" },
                "Subnets": self.refs(&p.subnets),
                "SecurityGroups": self.group_ids(&[&p.security_group]),
            }),
            ResourceProps::TargetGroup(p) => {
                let attributes: Vec<Json> = p
                    .attributes
                    .iter()
                    .map(|(k, v)| json!({ "Key": k, "Value": v }))
                    .collect();
                json!({
                    "Port": p.port,
                    "Protocol": p.protocol.as_str(),
                    "TargetType": p.target_type,
                    "VpcId": self.reference(&p.vpc),
                    "TargetGroupAttributes": attributes,
                })
            }
            ResourceProps::Listener(p) => {
                let action = match &p.default_action {
                    ListenerAction::Forward { target_group } => json!({
                        "Type": "forward",
                        "TargetGroupArn": self.reference(target_group),
                    }),
                    ListenerAction::Redirect(r) => json!({
                        "Type": "redirect",
                        "RedirectConfig": {
                            "Protocol": r.protocol.as_str(),
                            "Host": r.host,
                            "Port": r.port.to_string(),
                            "Path": r.path,
                            "Query": r.query,
                            "StatusCode": r.status_code,
                        },
                    }),
                };
                let certificates: Vec<Json> = p
                    .certificates
                    .iter()
                    .map(|c| json!({ "CertificateArn": self.reference(c) }))
                    .collect();
                let mut out = json!({
                    "LoadBalancerArn": self.reference(&p.load_balancer),
                    "Port": p.port,
                    "Protocol": p.protocol.as_str(),
                    "DefaultActions": [action],
                });
                if !certificates.is_empty() {
                    out["Certificates"] = Json::Array(certificates);
                }
                out
            }
            ResourceProps::LogGroup(p) => match p.retention_days {
                Some(days) => json!({ "RetentionInDays": days }),
                None => json!({}),
            },
            ResourceProps::Role(p) => json!({
                "Description": p.description,
                "AssumeRolePolicyDocument": {
                    "Version": POLICY_VERSION,
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": p.assumed_by },
                    }],
                },
            }),
            ResourceProps::TaskDefinition(p) => {
                let containers: Vec<Json> = p
                    .containers
                    .iter()
                    .map(|c| {
                        let environment: Vec<Json> = c
                            .environment
                            .iter()
                            .map(|(name, v)| json!({ "Name": name, "Value": self.value(v) }))
                            .collect();
                        let ports: Vec<Json> = c
                            .port_mappings
                            .iter()
                            .map(|port| json!({ "ContainerPort": port, "Protocol": "tcp" }))
                            .collect();
                        let mounts: Vec<Json> = c
                            .mount_points
                            .iter()
                            .map(|m| {
                                json!({
                                    "ContainerPath": m.container_path,
                                    "SourceVolume": m.source_volume,
                                    "ReadOnly": m.read_only,
                                })
                            })
                            .collect();
                        let mut out = json!({
                            "Name": c.name,
                            "Image": c.image,
                            "Essential": c.essential,
                            "PortMappings": ports,
                            "Environment": environment,
                            "MountPoints": mounts,
                        });
                        if let Some(group) = &c.log_group {
                            out["LogConfiguration"] = json!({
                                "LogDriver": "awslogs",
                                "Options": {
                                    "awslogs-group": self.reference(group),
                                    "awslogs-stream-prefix": c.name,
                                    "awslogs-region": { "Ref": "AWS::Region" },
                                },
                            });
                        }
                        out
                    })
                    .collect();
                let volumes: Vec<Json> = p
                    .volumes
                    .iter()
                    .map(|v| {
                        json!({
                            "Name": v.name,
                            "EFSVolumeConfiguration": {
                                "FilesystemId": self.reference(&v.efs.file_system),
                                "TransitEncryption": enabled(v.efs.transit_encryption),
                                "AuthorizationConfig": {
                                    "AccessPointId": self.reference(&v.efs.access_point),
                                    "IAM": enabled(v.efs.iam_authorization),
                                },
                            },
                        })
                    })
                    .collect();
                json!({
                    "Cpu": p.cpu.to_string(),
                    "Memory": p.memory_mib.to_string(),
                    "NetworkMode": p.network_mode,
                    "RequiresCompatibilities": p.requires_compatibilities,
                    "TaskRoleArn": self.attr(&p.task_role, Attribute::Arn),
                    "ExecutionRoleArn": self.attr(&p.execution_role, Attribute::Arn),
                    "ContainerDefinitions": containers,
                    "Volumes": volumes,
                })
            }
            ResourceProps::Service(p) => {
                let strategies: Vec<Json> = p
                    .capacity_provider_strategies
                    .iter()
                    .map(|s| {
                        json!({
                            "CapacityProvider": s.capacity_provider,
                            "Base": s.base,
                            "Weight": s.weight,
                        })
                    })
                    .collect();
                json!({
                    "Cluster": self.reference(&p.cluster),
                    "TaskDefinition": self.reference(&p.task_definition),
                    "DesiredCount": p.desired_count,
                    "CapacityProviderStrategy": strategies,
                    "EnableExecuteCommand": p.enable_execute_command,
                    "HealthCheckGracePeriodSeconds": p.health_check_grace_period_secs,
                    "NetworkConfiguration": {
                        "AwsvpcConfiguration": {
                            "AssignPublicIp": enabled(p.assign_public_ip),
                            "Subnets": self.refs(&p.subnets),
                            "SecurityGroups": self.group_ids(&[&p.security_group]),
                        },
                    },
                    "LoadBalancers": [{
                        "TargetGroupArn": self.reference(&p.load_balancer.target_group),
                        "ContainerName": p.load_balancer.container_name,
                        "ContainerPort": p.load_balancer.container_port,
                    }],
                })
            }
            ResourceProps::AliasRecord(p) => json!({
                "HostedZoneId": self.reference(&p.zone),
                "Name": format!("{}.", p.record_name),
                "Type": "A",
                "AliasTarget": {
                    "DNSName": self.value(&p.target_dns),
                    "HostedZoneId": self.value(&p.target_zone_id),
                },
            }),
        }
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "ENABLED"
    } else {
        "DISABLED"
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    fn type_name(self) -> &'static str {
        match self {
            Direction::Ingress => "AWS::EC2::SecurityGroupIngress",
            Direction::Egress => "AWS::EC2::SecurityGroupEgress",
        }
    }

    fn peer_key(self) -> &'static str {
        match self {
            Direction::Ingress => "SourceSecurityGroupId",
            Direction::Egress => "DestinationSecurityGroupId",
        }
    }

    fn preposition(self) -> &'static str {
        match self {
            Direction::Ingress => "from",
            Direction::Egress => "to",
        }
    }
}

/// Logical ids named by `Ref` or `Fn::GetAtt` anywhere in `json`.
fn collect_mentions<'j>(json: &'j Json, out: &mut HashSet<&'j str>) {
    match json {
        Json::Object(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("Ref", Json::String(id)) => {
                        out.insert(id);
                    }
                    ("Fn::GetAtt", Json::Array(parts)) => {
                        if let Some(Json::String(id)) = parts.first() {
                            out.insert(id);
                        }
                    }
                    _ => collect_mentions(value, out),
                }
            }
        }
        Json::Array(items) => {
            for item in items {
                collect_mentions(item, out);
            }
        }
        _ => {}
    }
}

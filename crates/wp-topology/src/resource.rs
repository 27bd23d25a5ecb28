//! Resource declarations
//!
//! Each resource is a typed property record. Cross-resource links are held as
//! [`LogicalId`]s or [`Value`] references, never as copies of the target's
//! attributes.

use crate::types::{Attribute, Cidr, LogicalId, RemovalPolicy, SubnetType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    HostedZone,
    Certificate,
    NatProvider,
    Vpc,
    InternetGateway,
    Subnet,
    SecurityGroup,
    NatInstance,
    Secret,
    DbSubnetGroup,
    DatabaseInstance,
    FileSystem,
    MountTarget,
    AccessPoint,
    Cluster,
    LoadBalancer,
    TargetGroup,
    Listener,
    LogGroup,
    Role,
    TaskDefinition,
    Service,
    AliasRecord,
}

impl ResourceKind {
    /// Control-plane type name used when synthesizing.
    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::HostedZone => "AWS::Route53::HostedZone",
            ResourceKind::Certificate => "AWS::CertificateManager::Certificate",
            ResourceKind::NatProvider => "Config::NatProvider",
            ResourceKind::Vpc => "AWS::EC2::VPC",
            ResourceKind::InternetGateway => "AWS::EC2::InternetGateway",
            ResourceKind::Subnet => "AWS::EC2::Subnet",
            ResourceKind::SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceKind::NatInstance => "AWS::EC2::Instance",
            ResourceKind::Secret => "AWS::SecretsManager::Secret",
            ResourceKind::DbSubnetGroup => "AWS::RDS::DBSubnetGroup",
            ResourceKind::DatabaseInstance => "AWS::RDS::DBInstance",
            ResourceKind::FileSystem => "AWS::EFS::FileSystem",
            ResourceKind::MountTarget => "AWS::EFS::MountTarget",
            ResourceKind::AccessPoint => "AWS::EFS::AccessPoint",
            ResourceKind::Cluster => "AWS::ECS::Cluster",
            ResourceKind::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            ResourceKind::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            ResourceKind::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            ResourceKind::LogGroup => "AWS::Logs::LogGroup",
            ResourceKind::Role => "AWS::IAM::Role",
            ResourceKind::TaskDefinition => "AWS::ECS::TaskDefinition",
            ResourceKind::Service => "AWS::ECS::Service",
            ResourceKind::AliasRecord => "AWS::Route53::RecordSet",
        }
    }

    /// Looked up rather than created.
    pub fn is_imported(self) -> bool {
        matches!(self, ResourceKind::HostedZone)
    }

    /// Settings folded into other resources; never provisioned on its own.
    pub fn is_config_only(self) -> bool {
        matches!(self, ResourceKind::NatProvider)
    }

    /// Whether the template carries a resource of this kind.
    pub fn is_provisioned(self) -> bool {
        !self.is_imported() && !self.is_config_only()
    }

    /// Whether the provisioning engine exposes `attribute` for this kind.
    pub fn supports(self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Id => true,
            Attribute::Arn => matches!(
                self,
                ResourceKind::Certificate
                    | ResourceKind::Secret
                    | ResourceKind::FileSystem
                    | ResourceKind::AccessPoint
                    | ResourceKind::Cluster
                    | ResourceKind::LoadBalancer
                    | ResourceKind::TargetGroup
                    | ResourceKind::Role
                    | ResourceKind::TaskDefinition
                    | ResourceKind::LogGroup
            ),
            Attribute::EndpointAddress | Attribute::EndpointPort => {
                self == ResourceKind::DatabaseInstance
            }
            Attribute::DnsName | Attribute::CanonicalHostedZoneId => {
                self == ResourceKind::LoadBalancer
            }
            Attribute::GroupId => self == ResourceKind::SecurityGroup,
            Attribute::CidrBlock => matches!(self, ResourceKind::Vpc | ResourceKind::Subnet),
        }
    }
}

/// A declared resource owned by the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: LogicalId,
    pub props: ResourceProps,
    pub removal_policy: RemovalPolicy,
    /// Ordering-only dependencies with no attribute flow.
    pub depends_on: Vec<LogicalId>,
}

impl Resource {
    pub fn new(id: LogicalId, props: impl Into<ResourceProps>) -> Self {
        Self {
            id,
            props: props.into(),
            removal_policy: RemovalPolicy::default(),
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.props.kind()
    }

    /// Every attribute reference held in the properties.
    pub fn attribute_refs(&self) -> Vec<(&LogicalId, Attribute)> {
        self.props
            .values()
            .into_iter()
            .filter_map(|v| match v {
                Value::Ref(r) => Some((&r.target, r.attribute)),
                Value::SecretField { secret, .. } => Some((secret, Attribute::Id)),
                Value::Literal(_) => None,
            })
            .collect()
    }

    /// Every resource this one reads from, in property order, deduplicated.
    pub fn references(&self) -> Vec<&LogicalId> {
        let mut refs = self.props.links();
        refs.extend(self.props.values().into_iter().filter_map(Value::reference));
        let mut seen = std::collections::HashSet::new();
        refs.retain(|id| seen.insert(*id));
        refs
    }
}

macro_rules! resource_props {
    ($($kind:ident($props:ident)),* $(,)?) => {
        /// Typed properties, one variant per resource kind
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "properties")]
        pub enum ResourceProps {
            $($kind($props),)*
        }

        impl ResourceProps {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(ResourceProps::$kind(_) => ResourceKind::$kind,)*
                }
            }
        }

        $(
            impl From<$props> for ResourceProps {
                fn from(value: $props) -> Self {
                    ResourceProps::$kind(value)
                }
            }
        )*
    };
}

resource_props! {
    HostedZone(HostedZoneProps),
    Certificate(CertificateProps),
    NatProvider(NatProviderProps),
    Vpc(VpcProps),
    InternetGateway(InternetGatewayProps),
    Subnet(SubnetProps),
    SecurityGroup(SecurityGroupProps),
    NatInstance(NatInstanceProps),
    Secret(SecretProps),
    DbSubnetGroup(DbSubnetGroupProps),
    DatabaseInstance(DatabaseInstanceProps),
    FileSystem(FileSystemProps),
    MountTarget(MountTargetProps),
    AccessPoint(AccessPointProps),
    Cluster(ClusterProps),
    LoadBalancer(LoadBalancerProps),
    TargetGroup(TargetGroupProps),
    Listener(ListenerProps),
    LogGroup(LogGroupProps),
    Role(RoleProps),
    TaskDefinition(TaskDefinitionProps),
    Service(ServiceProps),
    AliasRecord(AliasRecordProps),
}

impl ResourceProps {
    /// Structural links (by identifier) to other resources.
    pub fn links(&self) -> Vec<&LogicalId> {
        match self {
            ResourceProps::HostedZone(_)
            | ResourceProps::NatProvider(_)
            | ResourceProps::Secret(_)
            | ResourceProps::LogGroup(_)
            | ResourceProps::Role(_) => Vec::new(),
            ResourceProps::Certificate(p) => vec![&p.validation_zone],
            ResourceProps::Vpc(p) => vec![&p.nat_provider],
            ResourceProps::InternetGateway(p) => vec![&p.vpc],
            ResourceProps::Subnet(p) => vec![&p.vpc, p.egress.target()],
            ResourceProps::SecurityGroup(p) => vec![&p.vpc],
            ResourceProps::NatInstance(p) => vec![&p.provider, &p.subnet, &p.security_group],
            ResourceProps::DbSubnetGroup(p) => p.subnets.iter().collect(),
            ResourceProps::DatabaseInstance(p) => vec![&p.subnet_group, &p.security_group],
            ResourceProps::FileSystem(p) => p
                .policy
                .iter()
                .filter_map(|s| match &s.principal {
                    Principal::Role(id) => Some(id),
                    Principal::Any => None,
                })
                .collect(),
            ResourceProps::MountTarget(p) => vec![&p.file_system, &p.subnet, &p.security_group],
            ResourceProps::AccessPoint(p) => vec![&p.file_system],
            ResourceProps::Cluster(p) => vec![&p.vpc],
            ResourceProps::LoadBalancer(p) => {
                let mut v: Vec<_> = p.subnets.iter().collect();
                v.push(&p.security_group);
                v
            }
            ResourceProps::TargetGroup(p) => vec![&p.vpc],
            ResourceProps::Listener(p) => {
                let mut v = vec![&p.load_balancer];
                v.extend(p.certificates.iter());
                if let ListenerAction::Forward { target_group } = &p.default_action {
                    v.push(target_group);
                }
                v
            }
            ResourceProps::TaskDefinition(p) => {
                let mut v = vec![&p.task_role, &p.execution_role];
                for c in &p.containers {
                    v.extend(c.log_group.as_ref());
                }
                for vol in &p.volumes {
                    v.push(&vol.efs.file_system);
                    v.push(&vol.efs.access_point);
                }
                v
            }
            ResourceProps::Service(p) => {
                let mut v = vec![&p.cluster, &p.task_definition, &p.security_group];
                v.extend(p.subnets.iter());
                v.push(&p.load_balancer.target_group);
                v
            }
            ResourceProps::AliasRecord(p) => vec![&p.zone],
        }
    }

    /// Property values that may carry deferred references.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            ResourceProps::DatabaseInstance(p) => vec![&p.username, &p.password],
            ResourceProps::TaskDefinition(p) => p
                .containers
                .iter()
                .flat_map(|c| c.environment.values())
                .collect(),
            ResourceProps::AliasRecord(p) => vec![&p.target_dns, &p.target_zone_id],
            _ => Vec::new(),
        }
    }
}

/// Pre-existing DNS zone, resolved by lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZoneProps {
    pub zone_id: String,
    pub zone_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateProps {
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    /// Zone against which DNS ownership is proven.
    pub validation_zone: LogicalId,
}

/// How private subnets reach the internet: instance size and image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatProviderProps {
    pub instance_type: String,
    pub image_id: String,
    pub image_name: String,
    /// Instances placed, one per availability zone.
    pub instances: usize,
    pub source_dest_check: bool,
}

/// One NAT instance, living in a public subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatInstanceProps {
    pub provider: LogicalId,
    pub subnet: LogicalId,
    pub security_group: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcProps {
    pub name: String,
    pub cidr: Cidr,
    pub max_azs: usize,
    pub nat_gateways: usize,
    pub nat_provider: LogicalId,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGatewayProps {
    pub vpc: LogicalId,
}

/// Default route of a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Egress {
    InternetGateway(LogicalId),
    Nat(LogicalId),
}

impl Egress {
    pub fn target(&self) -> &LogicalId {
        match self {
            Egress::InternetGateway(id) | Egress::Nat(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetProps {
    pub vpc: LogicalId,
    pub availability_zone: String,
    pub subnet_type: SubnetType,
    pub cidr: Cidr,
    pub map_public_ip_on_launch: bool,
    pub egress: Egress,
}

/// Network identity; ingress and egress rules are graph grants, not properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupProps {
    pub description: String,
    pub vpc: LogicalId,
    pub allow_all_outbound: bool,
}

/// Generated credential; the password exists only on the provider side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretProps {
    pub description: String,
    pub template: BTreeMap<String, String>,
    pub generate_key: String,
    pub exclude_characters: String,
    pub password_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbSubnetGroupProps {
    pub description: String,
    pub subnets: Vec<LogicalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstanceProps {
    pub identifier: String,
    pub database_name: String,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub port: u16,
    pub allocated_storage_gib: u32,
    pub publicly_accessible: bool,
    pub multi_az: bool,
    pub username: Value,
    pub password: Value,
    pub subnet_group: LogicalId,
    pub security_group: LogicalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    Any,
    Role(LogicalId),
}

/// Resource-policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub principal: Principal,
    /// operator -> (key -> value)
    pub conditions: BTreeMap<String, BTreeMap<String, String>>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], principal: Principal) -> Self {
        Self {
            effect: Effect::Allow,
            actions: actions.iter().map(|a| (*a).to_string()).collect(),
            principal,
            conditions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_condition(mut self, operator: &str, key: &str, value: &str) -> Self {
        self.conditions
            .entry(operator.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn has_condition(&self, operator: &str, key: &str, value: &str) -> bool {
        self.conditions
            .get(operator)
            .and_then(|c| c.get(key))
            .is_some_and(|v| v == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemProps {
    pub performance_mode: String,
    pub encrypted: bool,
    pub policy: Vec<PolicyStatement>,
}

impl FileSystemProps {
    pub fn add_to_resource_policy(&mut self, statement: PolicyStatement) {
        if !self.policy.contains(&statement) {
            self.policy.push(statement);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountTargetProps {
    pub file_system: LogicalId,
    pub subnet: LogicalId,
    pub security_group: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointAcl {
    pub owner_uid: u32,
    pub owner_gid: u32,
    pub permissions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixUser {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointProps {
    pub file_system: LogicalId,
    pub path: String,
    pub create_acl: AccessPointAcl,
    pub posix_user: PosixUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterProps {
    pub vpc: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerProps {
    pub internet_facing: bool,
    pub subnets: Vec<LogicalId>,
    pub security_group: LogicalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupProps {
    pub vpc: LogicalId,
    pub port: u16,
    pub protocol: Protocol,
    pub target_type: String,
    pub attributes: BTreeMap<String, String>,
}

/// Redirect rule; `#{...}` placeholders keep the original request parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectAction {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: String,
    pub status_code: String,
}

impl RedirectAction {
    pub fn to_https(host: &str, port: u16) -> Self {
        Self {
            protocol: Protocol::Https,
            host: host.to_string(),
            port,
            path: "/#{path}".to_string(),
            query: "#{query}".to_string(),
            status_code: "HTTP_302".to_string(),
        }
    }

    /// Scheme, host and port every redirected request lands on.
    pub fn target_origin(&self) -> String {
        format!(
            "{}://{}:{}",
            self.protocol.as_str().to_ascii_lowercase(),
            self.host,
            self.port
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListenerAction {
    Forward { target_group: LogicalId },
    Redirect(RedirectAction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerProps {
    pub load_balancer: LogicalId,
    pub port: u16,
    pub protocol: Protocol,
    pub certificates: Vec<LogicalId>,
    pub default_action: ListenerAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupProps {
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProps {
    pub assumed_by: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub container_path: String,
    pub source_volume: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub essential: bool,
    pub port_mappings: Vec<u16>,
    pub environment: BTreeMap<String, Value>,
    pub log_group: Option<LogicalId>,
    pub mount_points: Vec<MountPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfsVolumeConfiguration {
    pub file_system: LogicalId,
    pub access_point: LogicalId,
    pub transit_encryption: bool,
    pub iam_authorization: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub efs: EfsVolumeConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinitionProps {
    pub cpu: u32,
    pub memory_mib: u32,
    pub network_mode: String,
    pub requires_compatibilities: Vec<String>,
    pub task_role: LogicalId,
    pub execution_role: LogicalId,
    pub containers: Vec<ContainerDefinition>,
    pub volumes: Vec<Volume>,
}

impl TaskDefinitionProps {
    pub fn find_container_mut(&mut self, name: &str) -> Option<&mut ContainerDefinition> {
        self.containers.iter_mut().find(|c| c.name == name)
    }

    pub fn find_container(&self, name: &str) -> Option<&ContainerDefinition> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProviderStrategy {
    pub capacity_provider: String,
    pub base: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLoadBalancer {
    pub target_group: LogicalId,
    pub container_name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProps {
    pub cluster: LogicalId,
    pub task_definition: LogicalId,
    pub desired_count: u32,
    pub capacity_provider_strategies: Vec<CapacityProviderStrategy>,
    pub subnets: Vec<LogicalId>,
    pub security_group: LogicalId,
    pub assign_public_ip: bool,
    pub enable_execute_command: bool,
    pub health_check_grace_period_secs: u32,
    pub load_balancer: ServiceLoadBalancer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecordProps {
    pub zone: LogicalId,
    pub record_name: String,
    pub target_dns: Value,
    pub target_zone_id: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props_kind_mapping() {
        let props: ResourceProps = LogGroupProps { retention_days: None }.into();
        assert_eq!(props.kind(), ResourceKind::LogGroup);
        assert_eq!(props.kind().type_name(), "AWS::Logs::LogGroup");
    }

    #[test]
    fn test_references_are_deduplicated() {
        let db = LogicalId::new("db");
        let secret = LogicalId::new("Secret");
        let props = DatabaseInstanceProps {
            identifier: "db".into(),
            database_name: "db".into(),
            engine: "mysql".into(),
            engine_version: "8.0.28".into(),
            instance_class: "db.t2.micro".into(),
            port: 3306,
            allocated_storage_gib: 100,
            publicly_accessible: false,
            multi_az: false,
            username: Value::secret_field(&secret, "username"),
            password: Value::secret_field(&secret, "password"),
            subnet_group: LogicalId::new("Group"),
            security_group: LogicalId::new("Sg"),
        };
        let resource = Resource::new(db, props);
        let refs: Vec<&str> = resource.references().iter().map(|r| r.as_str()).collect();
        assert_eq!(refs, vec!["Group", "Sg", "Secret"]);
    }

    #[test]
    fn test_redirect_origin_ignores_path() {
        let redirect = RedirectAction::to_https("example.com", 443);
        assert_eq!(redirect.target_origin(), "https://example.com:443");
        assert_eq!(redirect.path, "/#{path}");
    }

    #[test]
    fn test_policy_condition_lookup() {
        let statement = PolicyStatement::allow(&["a:B"], Principal::Any)
            .with_condition("Bool", "k", "true");
        assert!(statement.has_condition("Bool", "k", "true"));
        assert!(!statement.has_condition("Bool", "k", "false"));
        assert!(!statement.has_condition("StringEquals", "k", "true"));
    }

    #[test]
    fn test_nat_provider_is_not_provisioned() {
        assert!(!ResourceKind::NatProvider.is_provisioned());
        assert!(!ResourceKind::HostedZone.is_provisioned());
        assert!(ResourceKind::NatInstance.is_provisioned());
        assert_eq!(ResourceKind::NatInstance.type_name(), "AWS::EC2::Instance");
    }

    #[test]
    fn test_attribute_support() {
        assert!(ResourceKind::DatabaseInstance.supports(Attribute::EndpointAddress));
        assert!(!ResourceKind::Vpc.supports(Attribute::EndpointAddress));
        assert!(ResourceKind::LoadBalancer.supports(Attribute::DnsName));
    }
}

//! Fixed deployment parameters
//!
//! Sizes, ports, image identities and access-point settings used by the
//! builder. Everything provider-specific lives here so the stage modules only
//! deal with graph wiring.

#![allow(missing_docs)]

// Network
pub const VPC_CIDR: &str = "10.0.0.0/16";
pub const MAX_AZS: usize = 2;
pub const SUBNET_CIDR_MASK: u8 = 24;
pub const NAT_GATEWAYS: usize = 2;

// NAT instance
pub const NAT_INSTANCE_TYPE: &str = "t4g.micro";
pub const NAT_IMAGE_NAME_PATTERN: &str = "fck-nat-amzn2-*-arm64-ebs";
pub const NAT_IMAGE_OWNER: &str = "568608671756";

// Credentials
pub const SECRET_PASSWORD_KEY: &str = "password";
pub const SECRET_USERNAME_KEY: &str = "username";
/// Characters that break MySQL connection strings and URL encodings.
pub const SECRET_EXCLUDED_CHARACTERS: &str = "/@\"";
pub const SECRET_PASSWORD_LENGTH: usize = 32;

// Database
pub const DB_ENGINE: &str = "mysql";
pub const DB_ENGINE_VERSION: &str = "8.0.28";
pub const DB_INSTANCE_CLASS: &str = "db.t2.micro";
pub const DB_PORT: u16 = 3306;
pub const DB_ALLOCATED_STORAGE_GIB: u32 = 100;

// Shared filesystem
pub const EFS_PORT: u16 = 2049;
pub const EFS_PERFORMANCE_MODE: &str = "generalPurpose";
pub const ACCESS_POINT_PATH: &str = "/bitnami";
pub const POSIX_UID: u32 = 1000;
pub const POSIX_GID: u32 = 1000;
pub const ACCESS_POINT_PERMISSIONS: &str = "0777";
pub const EFS_ACTION_MOUNT: &str = "elasticfilesystem:ClientMount";
pub const EFS_ACTION_WRITE: &str = "elasticfilesystem:ClientWrite";
pub const EFS_ACTION_ROOT_ACCESS: &str = "elasticfilesystem:ClientRootAccess";
pub const EFS_MOUNT_TARGET_CONDITION_KEY: &str = "elasticfilesystem:AccessedViaMountTarget";

// Compute
pub const CONTAINER_IMAGE: &str = "bitnami/wordpress";
pub const CONTAINER_NAME: &str = "WordpressContainer";
pub const CONTAINER_PORT: u16 = 8080;
pub const TASK_CPU: u32 = 256;
pub const TASK_MEMORY_MIB: u32 = 512;
pub const DESIRED_COUNT: u32 = 2;
pub const CAPACITY_PROVIDER: &str = "FARGATE_SPOT";
pub const CAPACITY_BASE: u32 = 2;
pub const CAPACITY_WEIGHT: u32 = 2;
pub const ENABLE_EXECUTE_COMMAND: bool = true;
pub const PHP_MEMORY_LIMIT: &str = "512M";
pub const VOLUME_NAME: &str = "WordpressVolume";
pub const CONTAINER_MOUNT_PATH: &str = "/bitnami/wordpress";
pub const TASK_ROLE_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

// Load balancer
pub const HTTPS_PORT: u16 = 443;
pub const HTTP_PORT: u16 = 80;
pub const DEREGISTRATION_DELAY_ATTRIBUTE: &str = "deregistration_delay.timeout_seconds";
pub const DEREGISTRATION_DELAY_SECS: u32 = 30;

// Configuration fallbacks
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCOUNT: &str = "";
pub const DEFAULT_VPC_NAME: &str = "Vpc";
pub const DEFAULT_DOMAIN: &str = "";
pub const DEFAULT_DOMAIN_WILDCARD: &str = "";
pub const DEFAULT_DATABASE_INSTANCE: &str = "db";
pub const DEFAULT_DATABASE_NAME: &str = "db";
pub const DEFAULT_DATABASE_USER: &str = "admin";

//! Stateful resources: credential secret, database, shared filesystem

use super::network::Network;
use crate::config::DeploymentConfig;
use crate::defaults;
use crate::error::BuildError;
use crate::graph::ResourceGraph;
use crate::resource::{
    AccessPointAcl, AccessPointProps, DatabaseInstanceProps, DbSubnetGroupProps, FileSystemProps,
    MountTargetProps, PolicyStatement, PosixUser, Principal, Resource, SecretProps,
    SecurityGroupProps,
};
use crate::types::{LogicalId, RemovalPolicy, Value};
use std::collections::BTreeMap;

/// Handle to the generated database credential
#[derive(Debug, Clone)]
pub struct Credentials {
    pub secret: LogicalId,
}

impl Credentials {
    pub fn username(&self) -> Value {
        Value::secret_field(&self.secret, defaults::SECRET_USERNAME_KEY)
    }

    pub fn password(&self) -> Value {
        Value::secret_field(&self.secret, defaults::SECRET_PASSWORD_KEY)
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pub instance: LogicalId,
    pub security_group: LogicalId,
    pub port: u16,
    pub database_name: String,
}

#[derive(Debug, Clone)]
pub struct SharedStorage {
    pub file_system: LogicalId,
    pub security_group: LogicalId,
    pub mount_targets: Vec<LogicalId>,
    pub access_point: LogicalId,
}

pub fn build_secret(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
) -> Result<Credentials, BuildError> {
    let mut template = BTreeMap::new();
    template.insert(
        defaults::SECRET_USERNAME_KEY.to_string(),
        config.database_user.clone(),
    );

    let secret = graph.add_resource(Resource::new(
        LogicalId::new("WordpressSecret"),
        SecretProps {
            description: "WordPress database credentials".to_string(),
            template,
            generate_key: defaults::SECRET_PASSWORD_KEY.to_string(),
            exclude_characters: defaults::SECRET_EXCLUDED_CHARACTERS.to_string(),
            password_length: defaults::SECRET_PASSWORD_LENGTH,
        },
    ))?;
    Ok(Credentials { secret })
}

pub fn build_database(
    graph: &mut ResourceGraph,
    config: &DeploymentConfig,
    network: &Network,
    credentials: &Credentials,
) -> Result<Database, BuildError> {
    let id = LogicalId::from_name(&config.database_name);

    // one subnet per AZ
    let subnet_group = graph.add_resource(Resource::new(
        id.child("SubnetGroup"),
        DbSubnetGroupProps {
            description: format!("Subnet group for {} database", config.database_name),
            subnets: network.private_subnets.clone(),
        },
    ))?;

    let security_group = graph.add_resource(Resource::new(
        id.child("SecurityGroup"),
        SecurityGroupProps {
            description: "Security group for the database instance".to_string(),
            vpc: network.vpc.clone(),
            allow_all_outbound: true,
        },
    ))?;

    let instance = graph.add_resource(
        Resource::new(
            id,
            DatabaseInstanceProps {
                identifier: config.database_instance.clone(),
                database_name: config.database_name.clone(),
                engine: defaults::DB_ENGINE.to_string(),
                engine_version: defaults::DB_ENGINE_VERSION.to_string(),
                instance_class: defaults::DB_INSTANCE_CLASS.to_string(),
                port: defaults::DB_PORT,
                allocated_storage_gib: defaults::DB_ALLOCATED_STORAGE_GIB,
                publicly_accessible: false,
                multi_az: false,
                username: credentials.username(),
                password: credentials.password(),
                subnet_group,
                security_group: security_group.clone(),
            },
        )
        .with_removal_policy(RemovalPolicy::Snapshot),
    )?;

    Ok(Database {
        instance,
        security_group,
        port: defaults::DB_PORT,
        database_name: config.database_name.clone(),
    })
}

/// Mount-target-only policy: any principal, but only through the VPC.
pub fn mount_target_policy() -> PolicyStatement {
    PolicyStatement::allow(
        &[
            defaults::EFS_ACTION_MOUNT,
            defaults::EFS_ACTION_WRITE,
            defaults::EFS_ACTION_ROOT_ACCESS,
        ],
        Principal::Any,
    )
    .with_condition("Bool", defaults::EFS_MOUNT_TARGET_CONDITION_KEY, "true")
}

pub fn build_filesystem(
    graph: &mut ResourceGraph,
    network: &Network,
) -> Result<SharedStorage, BuildError> {
    let id = LogicalId::new("FileSystem");

    let security_group = graph.add_resource(Resource::new(
        id.child("EfsSecurityGroup"),
        SecurityGroupProps {
            description: "Security group for the shared filesystem".to_string(),
            vpc: network.vpc.clone(),
            allow_all_outbound: true,
        },
    ))?;

    let mut props = FileSystemProps {
        performance_mode: defaults::EFS_PERFORMANCE_MODE.to_string(),
        encrypted: true,
        policy: Vec::new(),
    };
    props.add_to_resource_policy(mount_target_policy());
    let file_system = graph.add_resource(
        Resource::new(id, props).with_removal_policy(RemovalPolicy::Retain),
    )?;

    let mut mount_targets = Vec::with_capacity(network.private_subnets.len());
    for (i, subnet) in network.private_subnets.iter().enumerate() {
        let target = graph.add_resource(Resource::new(
            file_system.child(&format!("EfsMountTarget{}", i + 1)),
            MountTargetProps {
                file_system: file_system.clone(),
                subnet: subnet.clone(),
                security_group: security_group.clone(),
            },
        ))?;
        mount_targets.push(target);
    }

    let access_point = graph.add_resource(Resource::new(
        LogicalId::new("WordpressAccessPoint"),
        AccessPointProps {
            file_system: file_system.clone(),
            path: defaults::ACCESS_POINT_PATH.to_string(),
            create_acl: AccessPointAcl {
                owner_uid: defaults::POSIX_UID,
                owner_gid: defaults::POSIX_GID,
                permissions: defaults::ACCESS_POINT_PERMISSIONS.to_string(),
            },
            posix_user: PosixUser {
                uid: defaults::POSIX_UID,
                gid: defaults::POSIX_GID,
            },
        },
    ))?;

    Ok(SharedStorage {
        file_system,
        security_group,
        mount_targets,
        access_point,
    })
}

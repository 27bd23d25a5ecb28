//! WordPress Topology (wp-topology)
//!
//! Declarative construction of a complete WordPress-on-containers deployment
//! as a typed resource graph, in two phases:
//! 1. **Declaration**: the builder adds resources in dependency order; links
//!    between them are references, never copied values
//! 2. **Resolution**: runtime attributes and generated secrets are filled in
//!    by the provisioning engine (simulated offline by [`resolve`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use wp_topology::prelude::*;
//!
//! let config = DeploymentConfig::from_env();
//! let context = StaticContext::from_file("context.json")?;
//!
//! let graph = build_topology(&config, &context)?;
//! let template = synthesize(&graph);
//! println!("{}", serde_json::to_string_pretty(&template)?);
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod defaults;
pub mod error;
pub mod graph;
pub mod resolve;
pub mod resource;
pub mod synth;
pub mod types;
pub mod validate;

pub use error::*;

/// Common imports for building and inspecting a topology
pub mod prelude {
    pub use crate::builder::{build_topology, TopologyBuilder};
    pub use crate::config::DeploymentConfig;
    pub use crate::context::{ContextProvider, HostedZone, ImageQuery, MachineImage, StaticContext};
    pub use crate::error::{BuildError, GraphError, LookupError, SpecificationError, ValidationError};
    pub use crate::graph::{Edge, EdgeKind, Grant, ResourceGraph};
    pub use crate::resolve::{resolve, ResolvedGraph};
    pub use crate::resource::{Resource, ResourceKind, ResourceProps};
    pub use crate::synth::synthesize;
    pub use crate::types::{Attribute, AttrRef, Cidr, LogicalId, Peer, PortRange, Value};
    pub use crate::validate::{validate, ValidationReport};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Resource Graph
//!
//! Owns every declared resource, the typed edges between them and the set of
//! access grants. Insertion enforces the construction contract:
//!
//! 1. A resource may only reference resources declared before it
//! 2. Referenced attributes must exist on the target kind
//! 3. Ordering edges stay acyclic
//! 4. Grants have set semantics, so repeating one is a no-op

use crate::error::GraphError;
use crate::resource::{Resource, ResourceKind, ResourceProps};
use crate::types::{LogicalId, Peer, PortRange};
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `from` reads an identifier or attribute of `to`
    Reference,
    /// `from` must be created after `to`
    DependsOn,
    /// `from` was granted access to `to`
    Grant,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: LogicalId,
    pub to: LogicalId,
    pub kind: EdgeKind,
}

/// Additive access relationship
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// Security-group ingress on `group` from `peer`
    Ingress {
        group: LogicalId,
        peer: Peer,
        port: PortRange,
    },
    /// Security-group egress from `group` to `peer`
    Egress {
        group: LogicalId,
        peer: Peer,
        port: PortRange,
    },
    /// IAM actions on `resource` for the role `principal`
    Iam {
        principal: LogicalId,
        resource: LogicalId,
        actions: Vec<String>,
    },
}

impl Grant {
    /// Resource whose perimeter is opened.
    pub fn target(&self) -> &LogicalId {
        match self {
            Grant::Ingress { group, .. } | Grant::Egress { group, .. } => group,
            Grant::Iam { resource, .. } => resource,
        }
    }

    /// Resource receiving the access, when it is part of the graph.
    pub fn grantee(&self) -> Option<&LogicalId> {
        match self {
            Grant::Ingress { peer, .. } | Grant::Egress { peer, .. } => peer.security_group(),
            Grant::Iam { principal, .. } => Some(principal),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: IndexMap<LogicalId, Resource>,
    edges: BTreeSet<Edge>,
    grants: BTreeSet<Grant>,
    dag: DiGraph<LogicalId, EdgeKind>,
    index: HashMap<LogicalId, NodeIndex>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource.
    ///
    /// Every identifier it mentions must already be in the graph.
    pub fn add_resource(&mut self, resource: Resource) -> Result<LogicalId, GraphError> {
        let id = resource.id.clone();
        if id.is_empty() {
            return Err(GraphError::EmptyIdentifier);
        }
        if self.resources.contains_key(&id) {
            return Err(GraphError::DuplicateResource(id));
        }
        self.check_references(&id, &resource, self.resources.len())?;

        let node = self.dag.add_node(id.clone());
        self.index.insert(id.clone(), node);

        let reference_edges: Vec<LogicalId> =
            resource.references().into_iter().cloned().collect();
        let depends_on = resource.depends_on.clone();
        self.resources.insert(id.clone(), resource);

        for to in reference_edges {
            self.link(&id, &to, EdgeKind::Reference)?;
        }
        for to in depends_on {
            self.link(&id, &to, EdgeKind::DependsOn)?;
        }

        tracing::debug!(resource = %id, "declared resource");
        Ok(id)
    }

    /// Rewrite a resource's properties in place.
    ///
    /// New references must still point at resources declared before `id`.
    /// References the rewrite drops lose their edges. Nothing changes when
    /// `f` fails.
    pub fn modify<F>(&mut self, id: &LogicalId, f: F) -> Result<(), GraphError>
    where
        F: FnOnce(&mut ResourceProps) -> Result<(), GraphError>,
    {
        let position = self
            .resources
            .get_index_of(id)
            .ok_or_else(|| GraphError::ResourceNotFound(id.clone()))?;
        let mut updated = self.resources[position].clone();
        let kind = updated.kind();
        f(&mut updated.props)?;
        if updated.kind() != kind {
            return Err(GraphError::KindChanged { id: id.clone() });
        }
        self.check_references(id, &updated, position)?;

        let reference_edges: Vec<LogicalId> =
            updated.references().into_iter().cloned().collect();
        let stale: Vec<LogicalId> = self.resources[position]
            .references()
            .into_iter()
            .filter(|to| !reference_edges.contains(to))
            .cloned()
            .collect();
        self.resources[position] = updated;
        for to in &stale {
            self.unlink(id, to, EdgeKind::Reference);
        }
        for to in reference_edges {
            self.link(id, &to, EdgeKind::Reference)?;
        }
        Ok(())
    }

    /// Record an access grant. Returns `false` when it already existed.
    pub fn grant(&mut self, grant: Grant) -> Result<bool, GraphError> {
        let target = grant.target();
        let target_kind = self
            .resources
            .get(target)
            .map(Resource::kind)
            .ok_or_else(|| GraphError::ResourceNotFound(target.clone()))?;
        if let Grant::Ingress { .. } | Grant::Egress { .. } = grant {
            if target_kind != ResourceKind::SecurityGroup {
                return Err(GraphError::InvalidGrantTarget {
                    target: target.clone(),
                    expected: "security group".to_string(),
                });
            }
        }
        if let Some(grantee) = grant.grantee() {
            if !self.resources.contains_key(grantee) {
                return Err(GraphError::DanglingReference {
                    from: target.clone(),
                    to: grantee.clone(),
                });
            }
        }
        if self.grants.contains(&grant) {
            return Ok(false);
        }

        if let Some(grantee) = grant.grantee() {
            self.edges.insert(Edge {
                from: grantee.clone(),
                to: target.clone(),
                kind: EdgeKind::Grant,
            });
        }
        tracing::debug!(resource = %grant.target(), "granted access");
        self.grants.insert(grant);
        Ok(true)
    }

    fn check_references(
        &self,
        id: &LogicalId,
        resource: &Resource,
        position: usize,
    ) -> Result<(), GraphError> {
        for to in resource.references().into_iter().chain(&resource.depends_on) {
            if to == id {
                return Err(GraphError::SelfLoop(id.clone()));
            }
            match self.resources.get_index_of(to) {
                None => {
                    return Err(GraphError::DanglingReference {
                        from: id.clone(),
                        to: to.clone(),
                    })
                }
                Some(i) if i >= position => {
                    return Err(GraphError::ForwardReference {
                        from: id.clone(),
                        to: to.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        for (target, attribute) in resource.attribute_refs() {
            let kind = self.resources[target].kind();
            if !kind.supports(attribute) {
                return Err(GraphError::UnsupportedAttribute {
                    target: target.clone(),
                    attribute: attribute.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    fn link(&mut self, from: &LogicalId, to: &LogicalId, kind: EdgeKind) -> Result<(), GraphError> {
        let edge = Edge {
            from: from.clone(),
            to: to.clone(),
            kind,
        };
        if !self.edges.insert(edge) {
            return Ok(());
        }
        let (a, b) = (self.index[to], self.index[from]);
        // dependency -> dependent, so a topological sort yields leaves first
        let e = self.dag.add_edge(a, b, kind);
        if petgraph::algo::is_cyclic_directed(&self.dag) {
            self.dag.remove_edge(e);
            self.edges.remove(&Edge {
                from: from.clone(),
                to: to.clone(),
                kind,
            });
            return Err(GraphError::CycleDetected {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(())
    }

    fn unlink(&mut self, from: &LogicalId, to: &LogicalId, kind: EdgeKind) {
        let edge = Edge {
            from: from.clone(),
            to: to.clone(),
            kind,
        };
        if !self.edges.remove(&edge) {
            return;
        }
        let stale = self
            .dag
            .edges_connecting(self.index[to], self.index[from])
            .find(|e| *e.weight() == kind)
            .map(|e| e.id());
        if let Some(e) = stale {
            self.dag.remove_edge(e);
        }
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.resources.contains_key(id)
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn resources_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(move |r| r.kind() == kind)
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.resources_of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn grants(&self) -> impl Iterator<Item = &Grant> {
        self.grants.iter()
    }

    /// Ingress rules opened on one security group.
    pub fn ingress_rules(&self, group: &LogicalId) -> Vec<(&Peer, PortRange)> {
        self.grants
            .iter()
            .filter_map(|grant| match grant {
                Grant::Ingress {
                    group: target,
                    peer,
                    port,
                } if target == group => Some((peer, *port)),
                _ => None,
            })
            .collect()
    }

    /// Egress rules opened from one security group.
    pub fn egress_rules(&self, group: &LogicalId) -> Vec<(&Peer, PortRange)> {
        self.grants
            .iter()
            .filter_map(|grant| match grant {
                Grant::Egress {
                    group: source,
                    peer,
                    port,
                } if source == group => Some((peer, *port)),
                _ => None,
            })
            .collect()
    }

    /// Creation order, leaves first.
    pub fn topological_order(&self) -> Result<Vec<LogicalId>, GraphError> {
        toposort(&self.dag, None)
            .map(|order| order.into_iter().map(|n| self.dag[n].clone()).collect())
            .map_err(|cycle| {
                let id = self.dag[cycle.node_id()].clone();
                GraphError::CycleDetected {
                    from: id.clone(),
                    to: id,
                }
            })
    }

    /// Structural digest of resources, edges and grants.
    ///
    /// Generated secrets and cloud-assigned identifiers never enter the graph,
    /// so two builds from the same configuration share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        // Sorted by id; declaration order does not matter
        let mut ids: Vec<_> = self.resources.keys().collect();
        ids.sort();
        for id in ids {
            hasher.update(id.as_str().as_bytes());
            hasher.update([0]);
            // Debug output is stable: resources hold no hash maps
            hasher.update(format!("{:?}", self.resources[id]).as_bytes());
            hasher.update([0]);
        }

        for edge in &self.edges {
            hasher.update(format!("{edge:?}").as_bytes());
        }
        for grant in &self.grants {
            hasher.update(format!("{grant:?}").as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}

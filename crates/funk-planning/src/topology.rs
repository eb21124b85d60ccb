//! Topology model: federation → sites → clusters, plus standalone
//! counters such as `kavlan`.
//!
//! Site capacity is the sum of its clusters and federation capacity the
//! sum of its sites, so aggregate ceilings always bound their members.

use std::collections::{BTreeMap, BTreeSet};

use funk_core::{CoreError, Request, ResourceId, TopologySpec};
use serde::Serialize;

use crate::error::{PlanningError, PlanningResult};

/// Position of a resource in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Federation,
    Site,
    Cluster,
    Standalone,
}

impl Level {
    /// Depth in the node hierarchy; deeper resources are more specific.
    pub fn depth(self) -> u8 {
        match self {
            Level::Federation => 0,
            Level::Site => 1,
            Level::Cluster | Level::Standalone => 2,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    level: Level,
    capacity: u32,
    parent: Option<ResourceId>,
    children: Vec<ResourceId>,
}

/// Immutable resource hierarchy loaded once per run.
#[derive(Debug, Clone)]
pub struct Topology {
    federation: ResourceId,
    nodes: BTreeMap<ResourceId, Node>,
}

impl Topology {
    pub fn from_spec(spec: &TopologySpec) -> PlanningResult<Self> {
        let federation = ResourceId::new(spec.federation.clone());
        let mut nodes: BTreeMap<ResourceId, Node> = BTreeMap::new();
        let mut insert = |id: ResourceId, node: Node| -> PlanningResult<()> {
            if nodes.insert(id.clone(), node).is_some() {
                return Err(CoreError::Inventory(format!("duplicate resource name: {id}")).into());
            }
            Ok(())
        };

        let mut federation_capacity = 0u32;
        let mut site_ids = Vec::new();
        for (site, clusters) in &spec.sites {
            let site_id = ResourceId::new(site.clone());
            let mut site_capacity = 0u32;
            let mut cluster_ids = Vec::new();
            for (cluster, capacity) in clusters {
                let cluster_id = ResourceId::new(cluster.clone());
                insert(
                    cluster_id.clone(),
                    Node {
                        level: Level::Cluster,
                        capacity: *capacity,
                        parent: Some(site_id.clone()),
                        children: Vec::new(),
                    },
                )?;
                site_capacity = site_capacity.saturating_add(*capacity);
                cluster_ids.push(cluster_id);
            }
            insert(
                site_id.clone(),
                Node {
                    level: Level::Site,
                    capacity: site_capacity,
                    parent: Some(federation.clone()),
                    children: cluster_ids,
                },
            )?;
            federation_capacity = federation_capacity.saturating_add(site_capacity);
            site_ids.push(site_id);
        }

        insert(
            federation.clone(),
            Node {
                level: Level::Federation,
                capacity: federation_capacity,
                parent: None,
                children: site_ids,
            },
        )?;

        for (name, capacity) in &spec.standalone {
            insert(
                ResourceId::new(name.clone()),
                Node {
                    level: Level::Standalone,
                    capacity: *capacity,
                    parent: None,
                    children: Vec::new(),
                },
            )?;
        }

        Ok(Self { federation, nodes })
    }

    fn node(&self, id: &str) -> PlanningResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| PlanningError::UnknownResource(ResourceId::from(id)))
    }

    pub fn federation(&self) -> &ResourceId {
        &self.federation
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn capacity_of(&self, id: &str) -> PlanningResult<u32> {
        Ok(self.node(id)?.capacity)
    }

    pub fn children_of(&self, id: &str) -> PlanningResult<&[ResourceId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn level_of(&self, id: &str) -> PlanningResult<Level> {
        Ok(self.node(id)?.level)
    }

    pub fn site_of(&self, cluster: &str) -> PlanningResult<&ResourceId> {
        let node = self.node(cluster)?;
        match (node.level, &node.parent) {
            (Level::Cluster, Some(site)) => Ok(site),
            _ => Err(PlanningError::NotACluster(ResourceId::from(cluster))),
        }
    }

    /// Owning resources, nearest first: a cluster yields its site then the
    /// federation.
    pub fn ancestors_of(&self, id: &str) -> PlanningResult<Vec<ResourceId>> {
        let mut out = Vec::new();
        let mut cursor = self.node(id)?.parent.as_ref();
        while let Some(parent) = cursor {
            out.push(parent.clone());
            cursor = self.node(parent.as_str())?.parent.as_ref();
        }
        Ok(out)
    }

    /// Leaf clusters beneath `id` (a cluster is its own leaf).
    pub fn clusters_under(&self, id: &str) -> PlanningResult<Vec<ResourceId>> {
        let node = self.node(id)?;
        Ok(match node.level {
            Level::Cluster => vec![ResourceId::from(id)],
            Level::Standalone => Vec::new(),
            Level::Site => node.children.clone(),
            Level::Federation => {
                let mut out = Vec::new();
                for site in &node.children {
                    out.extend(self.node(site.as_str())?.children.iter().cloned());
                }
                out
            }
        })
    }

    pub fn sites(&self) -> impl Iterator<Item = &ResourceId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.level == Level::Site)
            .map(|(id, _)| id)
    }

    /// The given resources and everything beneath them.
    pub fn closure<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ResourceId>,
    ) -> PlanningResult<BTreeSet<ResourceId>> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<ResourceId> = ids.into_iter().cloned().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id.as_str())?;
            stack.extend(node.children.iter().cloned());
            out.insert(id);
        }
        Ok(out)
    }

    /// Fails on the first requested resource missing from the topology.
    pub fn validate_request(&self, request: &Request) -> PlanningResult<()> {
        for id in request.resources() {
            self.node(id.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_topology() -> Topology {
        let mut spec = TopologySpec {
            federation: "grid5000".to_string(),
            ..Default::default()
        };
        spec.sites.insert(
            "lyon".to_string(),
            [("taurus".to_string(), 16), ("sagittaire".to_string(), 8)].into(),
        );
        spec.sites
            .insert("nancy".to_string(), [("graphene".to_string(), 40)].into());
        spec.standalone.insert("kavlan".to_string(), 3);
        Topology::from_spec(&spec).unwrap()
    }

    #[test]
    fn capacities_aggregate_upward() {
        let topo = make_topology();
        assert_eq!(topo.capacity_of("taurus").unwrap(), 16);
        assert_eq!(topo.capacity_of("lyon").unwrap(), 24);
        assert_eq!(topo.capacity_of("grid5000").unwrap(), 64);
        assert_eq!(topo.capacity_of("kavlan").unwrap(), 3);
    }

    #[test]
    fn membership_queries() {
        let topo = make_topology();
        assert_eq!(topo.site_of("taurus").unwrap().as_str(), "lyon");
        assert_eq!(
            topo.ancestors_of("graphene").unwrap(),
            vec![ResourceId::from("nancy"), ResourceId::from("grid5000")]
        );
        assert!(topo.ancestors_of("kavlan").unwrap().is_empty());
        assert_eq!(topo.children_of("lyon").unwrap().len(), 2);
        assert_eq!(topo.clusters_under("grid5000").unwrap().len(), 3);
        assert_eq!(topo.level_of("nancy").unwrap(), Level::Site);
        assert_eq!(topo.sites().count(), 2);
    }

    #[test]
    fn unknown_resource_is_reported() {
        let topo = make_topology();
        assert!(matches!(
            topo.capacity_of("paradent"),
            Err(PlanningError::UnknownResource(id)) if id.as_str() == "paradent"
        ));
        assert!(matches!(topo.site_of("lyon"), Err(PlanningError::NotACluster(_))));
        let req: Request = "taurus:2,paradent".parse().unwrap();
        assert!(topo.validate_request(&req).is_err());
    }

    #[test]
    fn closure_includes_descendants() {
        let topo = make_topology();
        let ids = [ResourceId::from("lyon"), ResourceId::from("kavlan")];
        let closure = topo.closure(ids.iter()).unwrap();
        let names: Vec<&str> = closure.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["kavlan", "lyon", "sagittaire", "taurus"]);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut spec = TopologySpec::default();
        spec.sites
            .insert("lyon".to_string(), [("lyon".to_string(), 1)].into());
        assert!(Topology::from_spec(&spec).is_err());
    }
}

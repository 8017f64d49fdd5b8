//! Path/visibility model.
//!
//! Services own operations, paths own path elements; cross references are ids into the arenas
//! held by [`DdgModel`].

use crate::error::{Error, Result};
use crate::payload::PayloadPath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServiceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathElemId(pub usize);

/// The node every path is centered on. Without an operation any operation of the service matches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FocalNode {
    pub service: String,
    #[serde(default)]
    pub operation: Option<String>,
}

impl FocalNode {
    pub fn new(service: impl Into<String>, operation: Option<String>) -> Self {
        Self {
            service: service.into(),
            operation,
        }
    }

    fn matches(&self, service: &str, operation: &str) -> bool {
        self.service == service && self.operation.as_deref().is_none_or(|op| op == operation)
    }
}

impl std::fmt::Display for FocalNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.operation {
            Some(op) => write!(f, "{}::{}", self.service, op),
            None => f.write_str(&self.service),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub operations: IndexMap<String, OperationId>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub service: ServiceId,
    pub path_elems: Vec<PathElemId>,
}

#[derive(Debug, Clone)]
pub struct Path {
    pub members: Vec<PathElemId>,
    pub focal_idx: usize,
}

#[derive(Debug, Clone)]
pub struct PathElem {
    pub path: PathId,
    pub operation: OperationId,
    pub member_idx: usize,
    /// `member_idx - focal_idx`: negative upstream, positive downstream.
    pub distance: isize,
    pub visibility_idx: usize,
}

/// How path elements collapse onto vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Density {
    /// One vertex per distinct focal-to-element chain.
    #[default]
    PreventPathEntanglement,
    /// One vertex per operation and side of the focal node.
    UpstreamVsDownstream,
    /// One vertex per operation and distance.
    OnePerLevel,
    /// One vertex per operation.
    MostConcise,
}

impl std::str::FromStr for Density {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ppe" | "prevent-path-entanglement" => Ok(Self::PreventPathEntanglement),
            "uvd" | "upstream-vs-downstream" => Ok(Self::UpstreamVsDownstream),
            "opl" | "one-per-level" => Ok(Self::OnePerLevel),
            "mc" | "most-concise" => Ok(Self::MostConcise),
            other => Err(format!("unknown density: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DdgModel {
    services: IndexMap<String, Service>,
    operations: Vec<Operation>,
    paths: Vec<Path>,
    path_elems: Vec<PathElem>,
    path_elems_by_distance: BTreeMap<isize, Vec<PathElemId>>,
    by_visibility_idx: Vec<PathElemId>,
}

impl DdgModel {
    pub fn new(payload: &[PayloadPath], focal: &FocalNode) -> Result<Self> {
        let mut model = Self {
            services: IndexMap::new(),
            operations: Vec::new(),
            paths: Vec::with_capacity(payload.len()),
            path_elems: Vec::new(),
            path_elems_by_distance: BTreeMap::new(),
            by_visibility_idx: Vec::new(),
        };

        for (path_idx, hops) in payload.iter().enumerate() {
            let focal_idx = hops
                .iter()
                .position(|h| focal.matches(&h.service, &h.operation))
                .ok_or_else(|| Error::MissingFocalNode {
                    path_idx,
                    focal: focal.to_string(),
                })?;

            let path_id = PathId(model.paths.len());
            let mut members = Vec::with_capacity(hops.len());
            for (member_idx, hop) in hops.iter().enumerate() {
                let operation = model.intern_operation(&hop.service, &hop.operation);
                let id = PathElemId(model.path_elems.len());
                let distance = member_idx as isize - focal_idx as isize;
                model.path_elems.push(PathElem {
                    path: path_id,
                    operation,
                    member_idx,
                    distance,
                    visibility_idx: 0,
                });
                model.operations[operation.0].path_elems.push(id);
                model
                    .path_elems_by_distance
                    .entry(distance)
                    .or_default()
                    .push(id);
                members.push(id);
            }
            model.paths.push(Path { members, focal_idx });
        }

        model.assign_visibility_indices();
        Ok(model)
    }

    fn intern_operation(&mut self, service: &str, operation: &str) -> OperationId {
        let service_idx = match self.services.get_index_of(service) {
            Some(idx) => idx,
            None => {
                let (idx, _) = self.services.insert_full(
                    service.to_string(),
                    Service {
                        name: service.to_string(),
                        operations: IndexMap::new(),
                    },
                );
                idx
            }
        };
        let next = OperationId(self.operations.len());
        let svc = &mut self.services[service_idx];
        if let Some(&id) = svc.operations.get(operation) {
            return id;
        }
        svc.operations.insert(operation.to_string(), next);
        self.operations.push(Operation {
            name: operation.to_string(),
            service: ServiceId(service_idx),
            path_elems: Vec::new(),
        });
        next
    }

    /// Assigns visibility indices outward from the focal node.
    ///
    /// One counter walks the focal group and then upstream (`0, -1, -2, ..`), the other walks
    /// downstream (`1, 2, ..`). The counter with the smaller absolute distance goes next, so
    /// downstream wins ties; a side with no group left yields to the other.
    fn assign_visibility_indices(&mut self) {
        let mut downstream: isize = 1;
        let mut upstream: isize = 0;
        let mut order: Vec<PathElemId> = Vec::with_capacity(self.path_elems.len());
        loop {
            let has_up = self.path_elems_by_distance.contains_key(&upstream);
            let has_down = self.path_elems_by_distance.contains_key(&downstream);
            if !has_up && !has_down {
                break;
            }
            let distance = if (upstream.abs() < downstream && has_up) || !has_down {
                upstream -= 1;
                upstream + 1
            } else {
                downstream += 1;
                downstream - 1
            };
            if let Some(group) = self.path_elems_by_distance.get(&distance) {
                order.extend(group.iter().copied());
            }
        }
        for (idx, id) in order.iter().enumerate() {
            self.path_elems[id.0].visibility_idx = idx;
        }
        self.by_visibility_idx = order;
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn path(&self, id: PathId) -> &Path {
        &self.paths[id.0]
    }

    pub fn path_elem(&self, id: PathElemId) -> &PathElem {
        &self.path_elems[id.0]
    }

    pub fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.0]
    }

    pub fn service(&self, id: ServiceId) -> &Service {
        &self.services[id.0]
    }

    /// Services by name, in first-seen order.
    pub fn services(&self) -> &IndexMap<String, Service> {
        &self.services
    }

    pub fn path_elems_by_distance(&self) -> &BTreeMap<isize, Vec<PathElemId>> {
        &self.path_elems_by_distance
    }

    pub fn path_elem_for_visibility_idx(&self, idx: usize) -> Option<PathElemId> {
        self.by_visibility_idx.get(idx).copied()
    }

    pub fn visibility_idx_count(&self) -> usize {
        self.by_visibility_idx.len()
    }

    /// Every visibility index within `hops` of the focal node. Because indices grow with
    /// `|distance|` this is always a prefix `0..n`.
    pub fn visibility_indices_within(&self, hops: usize) -> std::ops::Range<usize> {
        let hops = isize::try_from(hops).unwrap_or(isize::MAX);
        let n = self
            .path_elems_by_distance
            .range(-hops..=hops)
            .map(|(_, group)| group.len())
            .sum();
        0..n
    }

    /// The adjacent member one step closer to the focal node, if any.
    pub fn focal_side_neighbor(&self, id: PathElemId) -> Option<PathElemId> {
        let pe = self.path_elem(id);
        let members = &self.path(pe.path).members;
        match pe.distance.signum() {
            1 => members.get(pe.member_idx - 1).copied(),
            -1 => members.get(pe.member_idx + 1).copied(),
            _ => None,
        }
    }

    /// `service::operation`, or just the service name when operations are hidden.
    pub fn label(&self, id: PathElemId, show_op: bool) -> String {
        let op = self.operation(self.path_elem(id).operation);
        let service = &self.service(op.service).name;
        if show_op {
            format!("{service}::{}", op.name)
        } else {
            service.clone()
        }
    }

    /// The key of the vertex `id` collapses onto under `density`.
    pub fn vertex_key(&self, id: PathElemId, density: Density, show_op: bool) -> String {
        let pe = self.path_elem(id);
        match density {
            Density::PreventPathEntanglement => {
                let path = self.path(pe.path);
                let start = path.focal_idx.min(pe.member_idx);
                let len = pe.distance.unsigned_abs() + 1;
                path.members[start..start + len]
                    .iter()
                    .map(|&m| self.label(m, show_op))
                    .collect::<Vec<_>>()
                    .join("|")
            }
            Density::UpstreamVsDownstream => {
                let label = self.label(id, show_op);
                match pe.distance.signum() {
                    1 => format!("{label}|downstream"),
                    -1 => format!("{label}|upstream"),
                    _ => label,
                }
            }
            Density::OnePerLevel => {
                let label = self.label(id, show_op);
                if pe.distance == 0 {
                    label
                } else {
                    format!("{label}|{}", pe.distance)
                }
            }
            Density::MostConcise => self.label(id, show_op),
        }
    }
}

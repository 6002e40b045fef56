//! Dependent provider-resource loading.
//!
//! A provider declares its resources as an ordered list of [`ResourceNode`]s.
//! Each node is listed from one backend endpoint whose query parameters come
//! from the selection of an earlier node or from a form field. The cascade
//! loads nodes as soon as their parameters are known, seeds each selection
//! with the first item, and discards everything below a node whose upstream
//! parameters change.
//!
//! ```text
//!   org ──▶ project ──▶ environment ──▶ app (endpoint chosen by `scope` field)
//! ```
//!
//! An empty list resolves the node to the `"none"` sentinel. Nodes depending
//! on a sentinel resolve to the sentinel too, without a request.
//!
//! Loads are keyed by their [`ResourceQuery`]. A result whose query no longer
//! matches the node's current load is dropped, so the last request issued for
//! a node always wins regardless of completion order.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::api::{IntegrationApi, ResourceQuery};
use crate::error::{ApiError, CascadeError};
use crate::types::ProviderResource;

/// Selection value standing for "nothing to select".
pub const NONE: &str = "none";

/// Where a query parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// The id of the resource selected on another node.
    Parent(&'static str),
    /// A form field; the node waits until it is set.
    Field(&'static str),
    /// A form field; omitted from the query when unset.
    OptionalField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Param {
    name: &'static str,
    binding: Binding,
}

/// One endpoint choice of a routed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Field value selecting this route.
    pub when: &'static str,
    pub endpoint: &'static str,
    pub list_field: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Fixed {
        endpoint: &'static str,
        list_field: &'static str,
    },
    ByField {
        field: &'static str,
        routes: &'static [Route],
    },
}

/// A provider resource list the configuration form selects from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    key: &'static str,
    label: &'static str,
    endpoint: Endpoint,
    params: Vec<Param>,
    id_field: &'static str,
    name_field: &'static str,
    required: bool,
}

impl ResourceNode {
    /// A required node listed from `endpoint`, reading the list from
    /// `list_field`. Items are identified by `id` and named by `name`.
    #[must_use]
    pub fn new(
        key: &'static str,
        label: &'static str,
        endpoint: &'static str,
        list_field: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            endpoint: Endpoint::Fixed {
                endpoint,
                list_field,
            },
            params: Vec::new(),
            id_field: "id",
            name_field: "name",
            required: true,
        }
    }

    /// A required node whose endpoint is chosen by the value of `field`.
    #[must_use]
    pub fn routed(
        key: &'static str,
        label: &'static str,
        field: &'static str,
        routes: &'static [Route],
    ) -> Self {
        Self {
            endpoint: Endpoint::ByField { field, routes },
            ..Self::new(key, label, "", "")
        }
    }

    #[must_use]
    pub fn id_field(mut self, field: &'static str) -> Self {
        self.id_field = field;
        self
    }

    #[must_use]
    pub fn name_field(mut self, field: &'static str) -> Self {
        self.name_field = field;
        self
    }

    /// Pass the id selected on node `parent` as query parameter `name`.
    #[must_use]
    pub fn parent(mut self, name: &'static str, parent: &'static str) -> Self {
        self.params.push(Param {
            name,
            binding: Binding::Parent(parent),
        });
        self
    }

    /// Pass form field `field` as query parameter `name`.
    #[must_use]
    pub fn field(mut self, name: &'static str, field: &'static str) -> Self {
        self.params.push(Param {
            name,
            binding: Binding::Field(field),
        });
        self
    }

    /// Pass form field `field` as query parameter `name` when it is set.
    #[must_use]
    pub fn optional_field(mut self, name: &'static str, field: &'static str) -> Self {
        self.params.push(Param {
            name,
            binding: Binding::OptionalField(field),
        });
        self
    }

    /// The form may submit while this node is unresolved.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Plural display label, e.g. `apps`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    fn parents(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().filter_map(|p| match p.binding {
            Binding::Parent(parent) => Some(parent),
            _ => None,
        })
    }

    fn depends_on_field(&self, field: &str) -> bool {
        let routed = matches!(self.endpoint, Endpoint::ByField { field: f, .. } if f == field);
        routed
            || self.params.iter().any(|p| {
                matches!(p.binding, Binding::Field(f) | Binding::OptionalField(f) if f == field)
            })
    }

    fn to_resource(&self, raw: Value) -> Option<ProviderResource> {
        let (id, name) = match &raw {
            Value::String(s) => (s.clone(), s.clone()),
            Value::Object(map) => {
                let id = map.get(self.id_field).and_then(scalar)?;
                let name = map
                    .get(self.name_field)
                    .and_then(scalar)
                    .unwrap_or_else(|| id.clone());
                (id, name)
            }
            _ => return None,
        };
        Some(ProviderResource { id, name, raw })
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The current choice on a loaded node.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Resource(ProviderResource),
    /// The list was empty.
    None,
}

impl Selection {
    /// Form value: the resource id, or [`NONE`].
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Resource(resource) => &resource.id,
            Self::None => NONE,
        }
    }
}

/// Load state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Waiting on an upstream selection or field.
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
enum Slot {
    Idle,
    Loading(ResourceQuery),
    Loaded {
        items: Vec<ProviderResource>,
        selection: Selection,
    },
    Failed,
}

enum Plan {
    Blocked,
    Empty,
    Fetch(ResourceQuery),
}

/// One option of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Render model for one loaded node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorView {
    pub key: &'static str,
    pub label: &'static str,
    pub options: Vec<SelectOption>,
    pub selected: String,
    /// Set when the list is empty; the only option is the placeholder.
    pub disabled: bool,
}

/// Load and selection state for a provider's resource nodes.
#[derive(Debug, Clone)]
pub struct ResourceCascade {
    integration_auth_id: String,
    nodes: Vec<ResourceNode>,
    slots: Vec<Slot>,
    fields: BTreeMap<String, String>,
}

impl ResourceCascade {
    /// Build a cascade over `nodes`, which must list parents before children.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::DuplicateNode`] or
    /// [`CascadeError::UnknownParent`] for a malformed node list.
    pub fn new(
        integration_auth_id: impl Into<String>,
        nodes: Vec<ResourceNode>,
    ) -> Result<Self, CascadeError> {
        let mut seen = HashSet::new();
        for node in &nodes {
            if let Some(parent) = node.parents().find(|p| !seen.contains(p)) {
                return Err(CascadeError::UnknownParent {
                    node: node.key.to_owned(),
                    parent: parent.to_owned(),
                });
            }
            if !seen.insert(node.key) {
                return Err(CascadeError::DuplicateNode {
                    key: node.key.to_owned(),
                });
            }
        }

        let slots = vec![Slot::Idle; nodes.len()];
        Ok(Self {
            integration_auth_id: integration_auth_id.into(),
            nodes,
            slots,
            fields: BTreeMap::new(),
        })
    }

    /// Node definitions, in dependency order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    fn index_of(&self, key: &str) -> Result<usize, CascadeError> {
        self.nodes
            .iter()
            .position(|n| n.key == key)
            .ok_or_else(|| CascadeError::UnknownNode {
                key: key.to_owned(),
            })
    }

    /// Current value of a bound form field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Set or clear a form field, resetting every node that depends on it.
    pub fn set_field(&mut self, name: &str, value: Option<&str>) {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        if self.fields.get(name).map(String::as_str) == value {
            return;
        }
        match value {
            Some(v) => {
                self.fields.insert(name.to_owned(), v.to_owned());
            }
            None => {
                self.fields.remove(name);
            }
        }

        let affected: HashSet<&'static str> = self
            .nodes
            .iter()
            .filter(|n| n.depends_on_field(name))
            .map(|n| n.key)
            .collect();
        self.reset(affected);
    }

    /// Reset `keys` and everything downstream of them to idle.
    fn reset(&mut self, mut keys: HashSet<&'static str>) {
        for (node, slot) in self.nodes.iter().zip(self.slots.iter_mut()) {
            if keys.contains(node.key) || node.parents().any(|p| keys.contains(p)) {
                keys.insert(node.key);
                *slot = Slot::Idle;
            }
        }
    }

    fn reset_descendants(&mut self, key: &'static str) {
        let children: HashSet<&'static str> = self
            .nodes
            .iter()
            .filter(|n| n.parents().any(|p| p == key))
            .map(|n| n.key)
            .collect();
        if !children.is_empty() {
            self.reset(children);
        }
    }

    fn plan(&self, index: usize) -> Plan {
        let node = &self.nodes[index];
        let (endpoint, list_field) = match &node.endpoint {
            Endpoint::Fixed {
                endpoint,
                list_field,
            } => (*endpoint, *list_field),
            Endpoint::ByField { field, routes } => {
                let route = self
                    .fields
                    .get(*field)
                    .and_then(|value| routes.iter().find(|r| r.when == value.as_str()));
                match route {
                    Some(route) => (route.endpoint, route.list_field),
                    None => return Plan::Blocked,
                }
            }
        };

        let mut params = BTreeMap::new();
        for param in &node.params {
            match param.binding {
                Binding::Parent(parent) => {
                    let Ok(parent_index) = self.index_of(parent) else {
                        return Plan::Blocked;
                    };
                    match &self.slots[parent_index] {
                        Slot::Loaded {
                            selection: Selection::Resource(resource),
                            ..
                        } => {
                            params.insert(param.name.to_owned(), resource.id.clone());
                        }
                        Slot::Loaded {
                            selection: Selection::None,
                            ..
                        } => return Plan::Empty,
                        _ => return Plan::Blocked,
                    }
                }
                Binding::Field(field) => match self.fields.get(field) {
                    Some(value) => {
                        params.insert(param.name.to_owned(), value.clone());
                    }
                    None => return Plan::Blocked,
                },
                Binding::OptionalField(field) => {
                    if let Some(value) = self.fields.get(field) {
                        params.insert(param.name.to_owned(), value.clone());
                    }
                }
            }
        }

        Plan::Fetch(ResourceQuery {
            integration_auth_id: self.integration_auth_id.clone(),
            endpoint: endpoint.to_owned(),
            list_field: list_field.to_owned(),
            params,
        })
    }

    /// Mark every idle node whose parameters are known as loading and return
    /// the queries to issue. Nodes under an empty parent resolve to the
    /// sentinel here without a query.
    pub fn start(&mut self) -> Vec<ResourceQuery> {
        let mut queries = Vec::new();
        for index in 0..self.nodes.len() {
            if !matches!(self.slots[index], Slot::Idle) {
                continue;
            }
            match self.plan(index) {
                Plan::Blocked => {}
                Plan::Empty => {
                    self.slots[index] = Slot::Loaded {
                        items: Vec::new(),
                        selection: Selection::None,
                    };
                }
                Plan::Fetch(query) => {
                    self.slots[index] = Slot::Loading(query.clone());
                    queries.push(query);
                }
            }
        }
        queries
    }

    fn loading_index(&self, query: &ResourceQuery) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Slot::Loading(q) if q == query))
    }

    /// Apply the result of `query`. Returns `false` if the result is stale.
    pub fn complete(&mut self, query: &ResourceQuery, raw: Vec<Value>) -> bool {
        let Some(index) = self.loading_index(query) else {
            debug!(endpoint = %query.endpoint, "discarding stale resource list");
            return false;
        };

        let node = &self.nodes[index];
        let total = raw.len();
        let items: Vec<ProviderResource> =
            raw.into_iter().filter_map(|v| node.to_resource(v)).collect();
        if items.len() < total {
            debug!(
                node = node.key,
                skipped = total - items.len(),
                "skipping resources without an identifier"
            );
        }

        let selection = items
            .first()
            .cloned()
            .map_or(Selection::None, Selection::Resource);
        self.slots[index] = Slot::Loaded { items, selection };
        true
    }

    /// Record a failed load. Returns `false` if the query is stale.
    pub fn fail(&mut self, query: &ResourceQuery) -> bool {
        match self.loading_index(query) {
            Some(index) => {
                self.slots[index] = Slot::Failed;
                true
            }
            None => false,
        }
    }

    fn abandon(&mut self, query: &ResourceQuery) {
        if let Some(index) = self.loading_index(query) {
            self.slots[index] = Slot::Idle;
        }
    }

    /// Return failed nodes to idle so the next refresh reloads them.
    pub fn reset_failed(&mut self) {
        for slot in &mut self.slots {
            if matches!(slot, Slot::Failed) {
                *slot = Slot::Idle;
            }
        }
    }

    /// Load every node whose parameters are known, level by level, until
    /// nothing more can be loaded.
    ///
    /// # Errors
    ///
    /// Returns the first [`ApiError`]. The failing node is marked failed;
    /// other loads of the same level are left idle.
    pub async fn refresh(&mut self, api: &dyn IntegrationApi) -> Result<(), ApiError> {
        loop {
            let queries = self.start();
            if queries.is_empty() {
                return Ok(());
            }
            for (i, query) in queries.iter().enumerate() {
                match api.list_resources(query).await {
                    Ok(items) => {
                        self.complete(query, items);
                    }
                    Err(e) => {
                        self.fail(query);
                        for rest in &queries[i + 1..] {
                            self.abandon(rest);
                        }
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Select the resource with `id` on node `key`, resetting its descendants
    /// if the selection changed.
    ///
    /// # Errors
    ///
    /// Returns a [`CascadeError`] if the node is unknown or not loaded, or the
    /// id is not in its list.
    pub fn select(&mut self, key: &str, id: &str) -> Result<(), CascadeError> {
        let index = self.index_of(key)?;
        let node_key = self.nodes[index].key;
        let Slot::Loaded { items, selection } = &mut self.slots[index] else {
            return Err(CascadeError::NotLoaded {
                key: key.to_owned(),
            });
        };

        if items.is_empty() && id == NONE {
            return Ok(());
        }
        let resource = items
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| CascadeError::UnknownResource {
                key: key.to_owned(),
                id: id.to_owned(),
            })?;
        if selection.value() == resource.id {
            return Ok(());
        }
        *selection = Selection::Resource(resource);
        self.reset_descendants(node_key);
        Ok(())
    }

    /// The resource selected on `key`, if any.
    #[must_use]
    pub fn selected(&self, key: &str) -> Option<&ProviderResource> {
        let index = self.index_of(key).ok()?;
        match &self.slots[index] {
            Slot::Loaded {
                selection: Selection::Resource(resource),
                ..
            } => Some(resource),
            _ => None,
        }
    }

    /// Loaded items of `key`, in server order.
    #[must_use]
    pub fn items(&self, key: &str) -> Option<&[ProviderResource]> {
        let index = self.index_of(key).ok()?;
        match &self.slots[index] {
            Slot::Loaded { items, .. } => Some(items),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns [`CascadeError::UnknownNode`] for an unknown key.
    pub fn status(&self, key: &str) -> Result<NodeStatus, CascadeError> {
        Ok(match self.slots[self.index_of(key)?] {
            Slot::Idle => NodeStatus::Idle,
            Slot::Loading(_) => NodeStatus::Loading,
            Slot::Loaded { .. } => NodeStatus::Loaded,
            Slot::Failed => NodeStatus::Failed,
        })
    }

    /// Required nodes that have not finished loading.
    #[must_use]
    pub fn pending(&self) -> Vec<&'static str> {
        self.nodes
            .iter()
            .zip(&self.slots)
            .filter(|(node, slot)| node.required && !matches!(slot, Slot::Loaded { .. }))
            .map(|(node, _)| node.key)
            .collect()
    }

    /// Whether every required node has loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.pending().is_empty()
    }

    /// Required nodes that loaded empty.
    #[must_use]
    pub fn unresolved(&self) -> Vec<&ResourceNode> {
        self.nodes
            .iter()
            .zip(&self.slots)
            .filter(|(node, slot)| {
                node.required
                    && matches!(
                        slot,
                        Slot::Loaded {
                            selection: Selection::None,
                            ..
                        }
                    )
            })
            .map(|(node, _)| node)
            .collect()
    }

    /// Selectors for every loaded node, in dependency order.
    #[must_use]
    pub fn views(&self) -> Vec<SelectorView> {
        self.nodes
            .iter()
            .zip(&self.slots)
            .filter_map(|(node, slot)| match slot {
                Slot::Loaded { items, selection } => Some(selector(node, items, selection)),
                _ => None,
            })
            .collect()
    }
}

fn selector(node: &ResourceNode, items: &[ProviderResource], selection: &Selection) -> SelectorView {
    if items.is_empty() {
        return SelectorView {
            key: node.key,
            label: node.label,
            options: vec![SelectOption {
                value: NONE.to_owned(),
                label: format!("No {} found", node.label),
            }],
            selected: NONE.to_owned(),
            disabled: true,
        };
    }
    SelectorView {
        key: node.key,
        label: node.label,
        options: items
            .iter()
            .map(|r| SelectOption {
                value: r.id.clone(),
                label: r.name.clone(),
            })
            .collect(),
        selected: selection.value().to_owned(),
        disabled: false,
    }
}

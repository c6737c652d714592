//! Node factory system with self-registration and metadata
//!
//! A [`NodeRegistry`] maps type names to constructors. It is built once by
//! the host and passed to whatever needs to create nodes by name (loading
//! files, menus).

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::{GraphError, Result};
use crate::nodes::node::Node;

/// Menu family a node type is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeCategory {
    /// Literal values: numbers, colors
    Data,
    Math,
    /// Raster producers
    Image,
    /// Sub-graphs and their bridge nodes
    Group,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [Self::Data, Self::Math, Self::Image, Self::Group];

    pub fn name(self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::Math => "Math",
            Self::Image => "Image",
            Self::Group => "Group",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub node_type: &'static str,
    pub display_name: &'static str,
    pub category: NodeCategory,
    pub description: &'static str,
    /// Hidden types are created by the graph itself, not offered in menus
    pub hidden: bool,
}

impl NodeMetadata {
    pub fn new(
        node_type: &'static str,
        display_name: &'static str,
        category: NodeCategory,
        description: &'static str,
    ) -> Self {
        Self {
            node_type,
            display_name,
            category,
            description,
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Node factory trait implemented by every built-in kind
pub trait NodeFactory {
    fn metadata() -> NodeMetadata
    where
        Self: Sized;

    /// Build a fresh, unconnected node
    fn create() -> Node
    where
        Self: Sized;
}

/// Constructor stored in the registry
pub type NodeCreator = Box<dyn Fn() -> Node>;

/// Registry for managing node factories
pub struct NodeRegistry {
    creators: BTreeMap<String, NodeCreator>,
    metadata: BTreeMap<String, NodeMetadata>,
    categories: BTreeMap<NodeCategory, Vec<String>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            creators: BTreeMap::new(),
            metadata: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Register a node factory
    pub fn register<T: NodeFactory + 'static>(&mut self) {
        self.register_fn(T::metadata(), T::create);
    }

    /// Register a constructor under `metadata.node_type`. Registering a name
    /// again replaces the earlier constructor.
    pub fn register_fn(&mut self, metadata: NodeMetadata, creator: impl Fn() -> Node + 'static) {
        let node_type = metadata.node_type.to_string();
        if let Some(old) = self.metadata.get(&node_type) {
            warn!("Node type {} registered twice, replacing earlier constructor", node_type);
            if let Some(list) = self.categories.get_mut(&old.category) {
                list.retain(|t| *t != node_type);
            }
        }

        self.categories
            .entry(metadata.category)
            .or_default()
            .push(node_type.clone());
        self.creators.insert(node_type.clone(), Box::new(creator));
        self.metadata.insert(node_type, metadata);
    }

    /// Constructor for `node_type`, if registered
    pub fn lookup(&self, node_type: &str) -> Option<&NodeCreator> {
        self.creators.get(node_type)
    }

    /// Create a node by type name
    pub fn create(&self, node_type: &str) -> Result<Node> {
        let creator = self
            .lookup(node_type)
            .ok_or_else(|| GraphError::UnknownNodeType(node_type.to_string()))?;
        let mut node = creator();
        if node.type_name != node_type {
            debug!("Constructor for {} built a {}, retagging", node_type, node.type_name);
            node.type_name = node_type.to_string();
        }
        Ok(node)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.creators.contains_key(node_type)
    }

    /// Registered type names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.creators.keys().map(|s| s.as_str()).collect()
    }

    /// Get metadata for a node type without creating the node
    pub fn get_node_metadata(&self, node_type: &str) -> Option<&NodeMetadata> {
        self.metadata.get(node_type)
    }

    /// Visible node types in a category, sorted
    pub fn nodes_in_category(&self, category: NodeCategory) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .categories
            .get(&category)
            .map(|list| {
                list.iter()
                    .filter(|t| self.metadata.get(*t).is_some_and(|m| !m.hidden))
                    .map(|s| s.as_str())
                    .collect()
            })
            .unwrap_or_default();
        types.sort_unstable();
        types
    }

    /// Categories holding at least one visible type, in menu order
    pub fn categories(&self) -> Vec<NodeCategory> {
        self.categories
            .keys()
            .copied()
            .filter(|c| !self.nodes_in_category(*c).is_empty())
            .collect()
    }
}

impl Default for NodeRegistry {
    /// Registry with every built-in node kind
    fn default() -> Self {
        use crate::nodes::data::{ColorNodeFactory, NewImageNodeFactory, ValueNodeFactory};
        use crate::nodes::grouping::{GroupInputsFactory, GroupNodeFactory, GroupOutputsFactory};
        use crate::nodes::math::MathNodeFactory;

        let mut registry = Self::new();
        registry.register::<ValueNodeFactory>();
        registry.register::<ColorNodeFactory>();
        registry.register::<NewImageNodeFactory>();
        registry.register::<MathNodeFactory>();
        registry.register::<GroupNodeFactory>();
        registry.register::<GroupInputsFactory>();
        registry.register::<GroupOutputsFactory>();
        registry
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::node_types;

    #[test]
    fn test_default_registers_builtins() {
        let registry = NodeRegistry::default();
        assert_eq!(
            registry.list(),
            vec!["Color", "Group", "GroupInputs", "GroupOutputs", "Math", "NewImage", "Value"]
        );
        let node = registry.create(node_types::MATH).unwrap();
        assert_eq!(node.type_name, "Math");
        assert!(node.find_property("Result").is_some());
    }

    #[test]
    fn test_unknown_type() {
        let registry = NodeRegistry::default();
        assert!(matches!(
            registry.create("Spline"),
            Err(GraphError::UnknownNodeType(name)) if name == "Spline"
        ));
        assert!(registry.lookup("Spline").is_none());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = NodeRegistry::new();
        let meta = NodeMetadata::new("Thing", "Thing", NodeCategory::Data, "first");
        registry.register_fn(meta, || Node::new("Thing", "First"));
        let meta = NodeMetadata::new("Thing", "Thing", NodeCategory::Math, "second");
        registry.register_fn(meta, || Node::new("Thing", "Second"));

        assert_eq!(registry.create("Thing").unwrap().name, "Second");
        assert_eq!(registry.list().len(), 1);
        assert!(registry.nodes_in_category(NodeCategory::Data).is_empty());
        assert_eq!(registry.nodes_in_category(NodeCategory::Math), vec!["Thing"]);
    }

    #[test]
    fn test_hidden_types_stay_out_of_menus() {
        let registry = NodeRegistry::default();
        assert_eq!(registry.nodes_in_category(NodeCategory::Group), vec!["Group"]);
        assert!(registry.contains("GroupInputs"));
        let names: Vec<String> = registry.categories().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["Data", "Math", "Image", "Group"]);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(NodeCategory::from_name("image"), Some(NodeCategory::Image));
        assert_eq!(NodeCategory::from_name("Vector"), None);
        for category in NodeCategory::ALL {
            assert_eq!(NodeCategory::from_name(category.name()), Some(category));
        }
    }
}

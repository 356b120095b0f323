//! Node context injection
//!
//! In a simulation many nodes share one thread; every scheduler callback
//! acts on behalf of exactly one of them. [`NodeContextGuard`] records that
//! node in thread-local storage for the duration of a callback so that
//! [`NodeContextLayer`](crate::layers::NodeContextLayer) can tag spans with it.

use std::cell::RefCell;

use geofwd_core::NodeId;
use uuid::Uuid;

/// Node context stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    /// Node the current code runs on behalf of
    pub node_id: NodeId,
    /// Unique id for this run of the node
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Sets the node context for the current thread on creation and restores
/// the previous one (if any) on drop, so guards nest.
///
/// ```ignore
/// let _guard = NodeContextGuard::new(NodeId(7));
/// tracing::info!("Selected relays"); // tagged with node 7
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Enter the context of `node` with a fresh instance id
    pub fn new(node: NodeId) -> Self {
        Self::with_instance_id(node, Uuid::new_v4())
    }

    /// Enter the context of `node` with a fixed instance id
    ///
    /// Lets repeated callbacks of the same node share one instance id.
    pub fn with_instance_id(node: NodeId, instance_id: Uuid) -> Self {
        let context = NodeContextData {
            node_id: node,
            instance_id,
        };
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(context));
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current node id (if set)
    pub fn current_node() -> Option<NodeId> {
        Self::current().map(|ctx| ctx.node_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block in the context of a node
///
/// ```ignore
/// with_node_context!(NodeId(3), {
///     tracing::info!("Answering discovery");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($node:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($node);
        $body
    }};
}

//! Tracing layers that carry node context

use tracing::{Span, Subscriber, info_span, span};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::context::{NodeContextData, NodeContextGuard};

/// Layer that attaches the active node context to every new span
///
/// Spans created while a [`NodeContextGuard`] is alive carry a
/// [`NodeContextExtension`], which other layers can read back through the
/// registry.
pub struct NodeContextLayer;

impl NodeContextLayer {
    /// Create a new node context layer
    pub fn new() -> Self {
        Self
    }
}

impl Default for NodeContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct NodeContextExtension {
    pub data: NodeContextData,
}

impl<S> Layer<S> for NodeContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if let Some(node_ctx) = NodeContextGuard::current() {
            span.extensions_mut()
                .insert(NodeContextExtension { data: node_ctx });
        }
    }
}

/// Span naming the current node, for formatters that print span fields
///
/// Returns a disabled span when no node context is active.
pub fn node_span() -> Span {
    match NodeContextGuard::current() {
        Some(ctx) => info_span!(
            "node",
            node_id = %ctx.node_id,
            instance_id = %ctx.instance_id
        ),
        None => Span::none(),
    }
}

//! Handler tree composition.
//!
//! The embedder may install a handler tree before startup; the server must
//! graft its own pipeline group into that tree without disturbing the
//! handlers already present. The tree is a closed set of shapes so every
//! graft position is known statically; an unrecognized shape is a
//! setup-time error, never a silent replacement.

use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::http::RequestContext;

/// One stage in the request pipeline.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext);
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext) + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext) {
        self(ctx)
    }
}

/// A tree of handlers executed depth-first, in order, until some stage
/// marks the request handled.
pub enum HandlerTree {
    /// A single handler.
    Leaf(Arc<dyn Handler>),

    /// An ordered sequence of subtrees.
    Collection(Vec<HandlerTree>),

    /// A decorator around at most one delegate. An empty wrapper is a
    /// valid graft target: the pipeline becomes its delegate.
    Wrapper(Option<Box<HandlerTree>>),
}

impl HandlerTree {
    /// Run the tree against a request. Stages after the one that marks the
    /// request handled are skipped.
    pub fn invoke(&self, ctx: &mut RequestContext) {
        if ctx.is_handled() {
            return;
        }
        match self {
            HandlerTree::Leaf(handler) => handler.handle(ctx),
            HandlerTree::Collection(children) => {
                for child in children {
                    if ctx.is_handled() {
                        break;
                    }
                    child.invoke(ctx);
                }
            }
            HandlerTree::Wrapper(inner) => {
                if let Some(inner) = inner {
                    inner.invoke(ctx);
                }
            }
        }
    }
}

impl fmt::Debug for HandlerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerTree::Leaf(_) => f.write_str("Leaf"),
            HandlerTree::Collection(children) => {
                f.debug_list().entries(children.iter()).finish()
            }
            HandlerTree::Wrapper(inner) => f.debug_tuple("Wrapper").field(inner).finish(),
        }
    }
}

/// Graft the server's pipeline group into the embedder's tree.
///
/// With no embedder tree the group becomes the root, wrapped so later
/// decoration stays possible. A collection gains the group as its last
/// child, preserving the embedder's stages and their order. A wrapper is
/// descended recursively until a graft point is found. A bare leaf has no
/// position the group can occupy, so it is rejected.
pub fn attach_pipeline(
    user: Option<HandlerTree>,
    group: HandlerTree,
) -> Result<HandlerTree, ConfigError> {
    match user {
        None => Ok(HandlerTree::Wrapper(Some(Box::new(group)))),
        Some(HandlerTree::Collection(mut children)) => {
            children.push(group);
            Ok(HandlerTree::Collection(children))
        }
        Some(HandlerTree::Wrapper(inner)) => Ok(HandlerTree::Wrapper(Some(Box::new(
            graft_into_wrapper(inner, group)?,
        )))),
        Some(HandlerTree::Leaf(_)) => Err(ConfigError::UnrecognizedHandlerShape),
    }
}

/// Whether [`attach_pipeline`] can succeed for this tree. Lets callers
/// reject an unworkable shape before taking any other action.
pub fn graft_point_exists(tree: &HandlerTree) -> bool {
    match tree {
        HandlerTree::Leaf(_) => false,
        HandlerTree::Collection(_) => true,
        HandlerTree::Wrapper(None) => true,
        HandlerTree::Wrapper(Some(inner)) => graft_point_exists(inner),
    }
}

fn graft_into_wrapper(
    inner: Option<Box<HandlerTree>>,
    group: HandlerTree,
) -> Result<HandlerTree, ConfigError> {
    match inner.map(|boxed| *boxed) {
        None => Ok(group),
        Some(HandlerTree::Collection(mut children)) => {
            children.push(group);
            Ok(HandlerTree::Collection(children))
        }
        Some(HandlerTree::Wrapper(deeper)) => Ok(HandlerTree::Wrapper(Some(Box::new(
            graft_into_wrapper(deeper, group)?,
        )))),
        Some(HandlerTree::Leaf(_)) => Err(ConfigError::UnrecognizedHandlerShape),
    }
}

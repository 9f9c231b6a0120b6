//! Construction errors for trees and builders.

use thiserror::Error;

/// Errors raised while assembling a tree.
///
/// All of these are programmer mistakes surfaced synchronously at the
/// offending builder call; none occur during ticking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `end()` was called with no open composite.
    #[error("end() called with no open composite")]
    UnbalancedEnd,

    /// `build()` was called while composites were still open.
    #[error("build() called with {depth} unclosed composite(s)")]
    UnbalancedBuild { depth: usize },

    /// A pending decorator or repeat/retry modifier never received a node
    /// to wrap.
    #[error("pending decorator must wrap a node before end()/build()")]
    PendingDecorator,

    /// `build()` was called before any node was added.
    #[error("cannot build an empty tree")]
    EmptyTree,

    /// A parallel threshold of zero was requested.
    #[error("parallel {kind} threshold must be greater than zero")]
    ZeroThreshold { kind: &'static str },

    /// A per-child modifier was used under the wrong composite.
    #[error("modifier {modifier} is not accepted by the enclosing {composite} composite")]
    MisplacedModifier {
        modifier: &'static str,
        composite: &'static str,
    },

    /// A child was added to a switch without a preceding `case` or
    /// `default_case`.
    #[error("switch children must be labelled with case() or default_case()")]
    SwitchChildWithoutCase,

    /// A second top-level node was emitted outside any composite.
    #[error("a root node is already set; wrap top-level nodes in a composite")]
    RootAlreadySet,
}

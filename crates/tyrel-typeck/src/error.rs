//! Typing errors.

use thiserror::Error;
use tyrel_arith::{Cond, IndexExpr};
use tyrel_diagnostics::Span;
use tyrel_types::{IncompleteType, Kind, Ty};

/// Why a solver session failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Two types have different structure.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    Mismatch {
        /// The type on the assigned side.
        expected: Ty,
        /// The type it was unified with.
        found: Ty,
        /// What exactly differs, e.g. the rank.
        detail: Option<String>,
        /// Location last set by the failing relation.
        span: Span,
    },

    /// A variable would have to contain itself.
    #[error("infinite type: `?{}` occurs in `{ty}`", .var.id)]
    OccursCheck {
        /// The variable being bound.
        var: IncompleteType,
        /// The type it would be bound to.
        ty: Ty,
        /// Location last set by the failing relation.
        span: Span,
    },

    /// Two variables of different kinds were unified.
    #[error("kind mismatch: expected `{expected}`, found `{found}`")]
    KindMismatch {
        /// Kind of the first variable.
        expected: Kind,
        /// Kind of the second variable.
        found: Kind,
        /// Location last set by the failing relation.
        span: Span,
    },

    /// A relation asserted a provably false shape condition.
    #[error("assertion failed: {cond}")]
    AssertionFailed {
        /// The condition as asserted.
        cond: Cond,
        /// Location last set by the failing relation.
        span: Span,
    },

    /// Variables left without a type after all relations resolved.
    #[error("cannot infer types for {}", display_vars(.vars))]
    Unresolved {
        /// One variable per unresolved class, sorted by id.
        vars: Vec<IncompleteType>,
    },

    /// A relation never reported itself resolved.
    #[error("type relation `{name}` could not be resolved")]
    StuckRelation {
        /// Relation function name.
        name: String,
        /// Arguments with everything known substituted in.
        args: Vec<Ty>,
        /// True if the session hit its invocation limit.
        diverged: bool,
        /// Location of the operator call.
        span: Span,
    },

    /// Two tensor dimensions are provably different.
    #[error("dimension mismatch at axis {axis}: expected `{expected}`, found `{found}`")]
    DimensionMismatch {
        /// Axis index.
        axis: usize,
        /// Dimension on the assigned side.
        expected: IndexExpr,
        /// Dimension it was unified with.
        found: IndexExpr,
        /// Location last set by the failing relation.
        span: Span,
    },
}

fn display_vars(vars: &[IncompleteType]) -> String {
    vars.iter()
        .map(|v| format!("`?{}`", v.id))
        .collect::<Vec<_>>()
        .join(", ")
}

impl TypeError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Mismatch { .. } => "T0001",
            Self::OccursCheck { .. } => "T0002",
            Self::KindMismatch { .. } => "T0003",
            Self::AssertionFailed { .. } => "T0004",
            Self::Unresolved { .. } => "T0005",
            Self::StuckRelation { .. } => "T0006",
            Self::DimensionMismatch { .. } => "T0007",
        }
    }

    /// Where the error happened, if it has a location.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Mismatch { span, .. }
            | Self::OccursCheck { span, .. }
            | Self::KindMismatch { span, .. }
            | Self::AssertionFailed { span, .. }
            | Self::StuckRelation { span, .. }
            | Self::DimensionMismatch { span, .. } => Some(*span),
            Self::Unresolved { .. } => None,
        }
    }
}

//! The expression graph: [`Expression`] is implemented by
//! every node type that can sit anywhere in a lazy computation — dense
//! containers, scalars, and the functor-applying nodes built by
//! [`crate::ops`].

pub mod functor;
pub mod node;
pub mod scalar;

use crate::element::Element;
use crate::error::Error;
use crate::iter::BroadcastIter;
use crate::shape::{Layout, Shape, Strides};
use crate::stepper::Stepper;

/// Any lazily-evaluated, shaped, broadcastable expression.
///
/// `Expression` never owns a result buffer (except [`crate::container::Container`],
/// the one type that is both a leaf and a buffer). Every operation reads
/// elements on demand through a [`Stepper`], so building `a + b` does no
/// arithmetic until something iterates or assigns the result.
pub trait Expression {
    /// The element type this expression produces.
    type Value: Element;

    /// The stepper type this expression drives iteration with. Generic over
    /// the borrow of `self` since most steppers hold raw pointers/indices
    /// derived from `&self`.
    type Stepper<'a>: Stepper<Value = Self::Value>
    where
        Self: 'a;

    /// Number of axes.
    fn dimension(&self) -> usize;

    /// This expression's own shape (not broadcast against anything).
    fn shape(&self) -> Shape;

    /// Broadcasts this expression's shape into `output` in place, per
    /// [`crate::shape::broadcast_shape`]'s semantics.
    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error>;

    /// `true` if this expression, broadcast to the shape implied by
    /// `strides`, can be walked with the same linear pass as that stride
    /// sequence (no re-indexing needed).
    fn is_trivial_broadcast(&self, strides: &Strides) -> bool;

    /// Multi-index element access, trailing-axis addressed:
    /// `indices.len()` may be less than `self.dimension()`.
    fn at(&self, indices: &[usize]) -> Self::Value;

    /// Builds a stepper seeded at the first element, with this
    /// expression's own shape/strides re-expressed against `target_shape`.
    fn stepper_begin(&self, target_shape: &Shape) -> Self::Stepper<'_>;

    /// Builds a stepper seeded one past the last element in `layout`'s
    /// visitation order.
    fn stepper_end(&self, target_shape: &Shape, layout: Layout) -> Self::Stepper<'_> {
        let mut s = self.stepper_begin(target_shape);
        s.to_end(layout);
        s
    }

    /// A broadcast-aware iterator over this expression's elements,
    /// re-indexed against `target_shape`.
    fn broadcast_iter(&self, target_shape: &Shape) -> BroadcastIter<Self::Stepper<'_>> {
        let stepper = self.stepper_begin(target_shape);
        BroadcastIter::new(stepper, target_shape.clone(), Layout::RowMajor)
    }
}

/// Blanket conversion used to lift scalar literals into the expression
/// graph implicitly at operator call sites.
pub trait IntoExpression {
    type Expr: Expression;
    fn into_expression(self) -> Self::Expr;
}

impl<E: Expression> IntoExpression for E {
    type Expr = E;
    fn into_expression(self) -> E {
        self
    }
}

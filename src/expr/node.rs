//! Expression nodes: apply a pure [`crate::expr::functor`] to
//! one, two or three child expressions without evaluating anything until a
//! stepper or iterator walks the result.

use std::marker::PhantomData;

use crate::element::Element;
use crate::error::Error;
use crate::expr::Expression;
use crate::expr::functor::{BinaryFunctor, TernaryFunctor, UnaryFunctor};
use crate::shape::{Layout, Shape, Strides};
use crate::stepper::{BinaryNodeStepper, Stepper, TernaryNodeStepper, UnaryNodeStepper};

/// Slices `indices` down to the trailing `ndim` entries, the addressing
/// convention every [`Expression::at`] implementation uses:
/// broadcasting only ever adds *leading* axes, so a child with fewer axes
/// than the caller's index vector reads from the back of it.
pub(crate) fn trailing(indices: &[usize], ndim: usize) -> &[usize] {
    &indices[indices.len() - ndim..]
}

/// A node applying a unary functor `F` to a single child expression.
pub struct UnaryNode<F, A> {
    child: A,
    _marker: PhantomData<F>,
}

impl<F, A> UnaryNode<F, A> {
    pub fn new(child: A) -> Self {
        UnaryNode {
            child,
            _marker: PhantomData,
        }
    }
}

impl<F, A> Expression for UnaryNode<F, A>
where
    A: Expression,
    F: UnaryFunctor<A::Value>,
{
    type Value = F::Output;
    type Stepper<'a>
        = UnaryNodeStepper<A::Stepper<'a>, F>
    where
        Self: 'a,
        A: 'a;

    fn dimension(&self) -> usize {
        self.child.dimension()
    }

    fn shape(&self) -> Shape {
        self.child.shape()
    }

    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error> {
        self.child.broadcast_shape(output)
    }

    fn is_trivial_broadcast(&self, strides: &Strides) -> bool {
        self.child.is_trivial_broadcast(strides)
    }

    fn at(&self, indices: &[usize]) -> Self::Value {
        let idx = trailing(indices, self.child.dimension());
        F::eval(self.child.at(idx))
    }

    fn stepper_begin(&self, target_shape: &Shape) -> Self::Stepper<'_> {
        UnaryNodeStepper::new(self.child.stepper_begin(target_shape))
    }
}

/// A node applying a binary functor `F` to two child expressions,
/// broadcasting them against each other.
pub struct BinaryNode<F, A, B> {
    lhs: A,
    rhs: B,
    _marker: PhantomData<F>,
}

impl<F, A, B> BinaryNode<F, A, B> {
    pub fn new(lhs: A, rhs: B) -> Self {
        BinaryNode {
            lhs,
            rhs,
            _marker: PhantomData,
        }
    }
}

impl<F, A, B> Expression for BinaryNode<F, A, B>
where
    A: Expression,
    B: Expression,
    F: BinaryFunctor<A::Value, B::Value>,
{
    type Value = F::Output;
    type Stepper<'a>
        = BinaryNodeStepper<A::Stepper<'a>, B::Stepper<'a>, F>
    where
        Self: 'a,
        A: 'a,
        B: 'a;

    fn dimension(&self) -> usize {
        self.lhs.dimension().max(self.rhs.dimension())
    }

    fn shape(&self) -> Shape {
        let mut out = self.lhs.shape();
        self.rhs
            .broadcast_shape(&mut out)
            .expect("incompatible operand shapes queried eagerly via Expression::shape");
        out
    }

    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error> {
        let lhs_exact = self.lhs.broadcast_shape(output)?;
        let rhs_exact = self.rhs.broadcast_shape(output)?;
        Ok(lhs_exact && rhs_exact)
    }

    fn is_trivial_broadcast(&self, strides: &Strides) -> bool {
        self.lhs.is_trivial_broadcast(strides) && self.rhs.is_trivial_broadcast(strides)
    }

    fn at(&self, indices: &[usize]) -> Self::Value {
        let lhs_idx = trailing(indices, self.lhs.dimension());
        let rhs_idx = trailing(indices, self.rhs.dimension());
        F::eval(self.lhs.at(lhs_idx), self.rhs.at(rhs_idx))
    }

    fn stepper_begin(&self, target_shape: &Shape) -> Self::Stepper<'_> {
        BinaryNodeStepper::new(
            self.lhs.stepper_begin(target_shape),
            self.rhs.stepper_begin(target_shape),
        )
    }
}

/// A node applying a ternary functor `F` (only [`crate::expr::functor::Fma`]
/// in this library) to three child expressions.
pub struct TernaryNode<F, A, B, C> {
    a: A,
    b: B,
    c: C,
    _marker: PhantomData<F>,
}

impl<F, A, B, C> TernaryNode<F, A, B, C> {
    pub fn new(a: A, b: B, c: C) -> Self {
        TernaryNode {
            a,
            b,
            c,
            _marker: PhantomData,
        }
    }
}

impl<F, A, B, C> Expression for TernaryNode<F, A, B, C>
where
    A: Expression,
    B: Expression,
    C: Expression,
    F: TernaryFunctor<A::Value, B::Value, C::Value>,
{
    type Value = F::Output;
    type Stepper<'a>
        = TernaryNodeStepper<A::Stepper<'a>, B::Stepper<'a>, C::Stepper<'a>, F>
    where
        Self: 'a,
        A: 'a,
        B: 'a,
        C: 'a;

    fn dimension(&self) -> usize {
        self.a.dimension().max(self.b.dimension()).max(self.c.dimension())
    }

    fn shape(&self) -> Shape {
        let mut out = self.a.shape();
        self.b
            .broadcast_shape(&mut out)
            .expect("incompatible operand shapes queried eagerly via Expression::shape");
        self.c
            .broadcast_shape(&mut out)
            .expect("incompatible operand shapes queried eagerly via Expression::shape");
        out
    }

    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error> {
        let a_exact = self.a.broadcast_shape(output)?;
        let b_exact = self.b.broadcast_shape(output)?;
        let c_exact = self.c.broadcast_shape(output)?;
        Ok(a_exact && b_exact && c_exact)
    }

    fn is_trivial_broadcast(&self, strides: &Strides) -> bool {
        self.a.is_trivial_broadcast(strides)
            && self.b.is_trivial_broadcast(strides)
            && self.c.is_trivial_broadcast(strides)
    }

    fn at(&self, indices: &[usize]) -> Self::Value {
        let a_idx = trailing(indices, self.a.dimension());
        let b_idx = trailing(indices, self.b.dimension());
        let c_idx = trailing(indices, self.c.dimension());
        F::eval(self.a.at(a_idx), self.b.at(b_idx), self.c.at(c_idx))
    }

    fn stepper_begin(&self, target_shape: &Shape) -> Self::Stepper<'_> {
        TernaryNodeStepper::new(
            self.a.stepper_begin(target_shape),
            self.b.stepper_begin(target_shape),
            self.c.stepper_begin(target_shape),
        )
    }
}

/// Stepper for [`Vectorize`]: delegates positioning to the child, applies
/// the closure on dereference.
pub struct VectorizeStepper<S, R, Closure> {
    child: S,
    f: Closure,
    _marker: PhantomData<R>,
}

impl<S, R, Closure> Stepper for VectorizeStepper<S, R, Closure>
where
    S: Stepper,
    R: Element,
    Closure: Fn(S::Value) -> R + Copy,
{
    type Value = R;
    fn step(&mut self, axis: usize) {
        self.child.step(axis);
    }
    fn step_n(&mut self, axis: usize, n: usize) {
        self.child.step_n(axis, n);
    }
    fn step_back(&mut self, axis: usize) {
        self.child.step_back(axis);
    }
    fn step_back_n(&mut self, axis: usize, n: usize) {
        self.child.step_back_n(axis, n);
    }
    fn reset(&mut self, axis: usize) {
        self.child.reset(axis);
    }
    fn reset_back(&mut self, axis: usize) {
        self.child.reset_back(axis);
    }
    fn to_begin(&mut self) {
        self.child.to_begin();
    }
    fn to_end(&mut self, layout: Layout) {
        self.child.to_end(layout);
    }
    fn deref(&self) -> R {
        (self.f)(self.child.deref())
    }
}

/// Lifts an arbitrary `Fn(A::Value) -> R` closure into the expression
/// graph: wraps a scalar function so it broadcasts over an entire
/// expression.
pub struct Vectorize<A, R, Closure> {
    child: A,
    f: Closure,
    _marker: PhantomData<R>,
}

impl<A, R, Closure> Vectorize<A, R, Closure>
where
    A: Expression,
    R: Element,
    Closure: Fn(A::Value) -> R,
{
    pub fn new(child: A, f: Closure) -> Self {
        Vectorize {
            child,
            f,
            _marker: PhantomData,
        }
    }
}

impl<A, R, Closure> Expression for Vectorize<A, R, Closure>
where
    A: Expression,
    R: Element,
    Closure: Fn(A::Value) -> R + Copy,
{
    type Value = R;
    type Stepper<'a>
        = VectorizeStepper<A::Stepper<'a>, R, Closure>
    where
        Self: 'a,
        A: 'a;

    fn dimension(&self) -> usize {
        self.child.dimension()
    }

    fn shape(&self) -> Shape {
        self.child.shape()
    }

    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error> {
        self.child.broadcast_shape(output)
    }

    fn is_trivial_broadcast(&self, strides: &Strides) -> bool {
        self.child.is_trivial_broadcast(strides)
    }

    fn at(&self, indices: &[usize]) -> R {
        (self.f)(self.child.at(indices))
    }

    fn stepper_begin(&self, target_shape: &Shape) -> Self::Stepper<'_> {
        VectorizeStepper {
            child: self.child.stepper_begin(target_shape),
            f: self.f,
            _marker: PhantomData,
        }
    }
}

/// Wraps `f` so it can be applied element-wise to any expression via
/// [`crate::ops::vectorize`].
pub fn vectorize<A, R, Closure>(child: A, f: Closure) -> Vectorize<A, R, Closure>
where
    A: Expression,
    R: Element,
    Closure: Fn(A::Value) -> R + Copy,
{
    Vectorize::new(child, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::expr::functor::{Add, Neg};
    use crate::shape::Layout as Lay;

    #[test]
    fn unary_node_applies_functor_lazily() {
        let c = Container::from_shape_with(Shape::new(&[3]), Lay::RowMajor, |idx| idx[0] as i32)
            .unwrap();
        let node = UnaryNode::<Neg, _>::new(&c);
        assert_eq!(node.at(&[1]), -1);
        assert_eq!(node.at(&[2]), -2);
    }

    #[test]
    fn binary_node_broadcasts_children() {
        let a = Container::from_shape_with(Shape::new(&[2, 3]), Lay::RowMajor, |idx| {
            (idx[0] * 10 + idx[1]) as i32
        })
        .unwrap();
        let b = Container::from_shape_with(Shape::new(&[3]), Lay::RowMajor, |idx| idx[0] as i32)
            .unwrap();
        let node = BinaryNode::<Add, _, _>::new(&a, &b);
        assert_eq!(node.shape(), Shape::new(&[2, 3]));
        assert_eq!(node.at(&[1, 2]), 12 + 2);
    }

    #[test]
    fn vectorize_applies_closure_element_wise() {
        let c = Container::from_shape_with(Shape::new(&[2]), Lay::RowMajor, |idx| idx[0] as i32)
            .unwrap();
        let v = vectorize(&c, |x: i32| x * x);
        assert_eq!(v.at(&[1]), 1);
    }
}

//! Steppers: per-axis step/reset cursors that walk an
//! expression's elements against a (possibly broadcast) target shape
//! without materializing indices.

use std::marker::PhantomData;

use crate::element::Element;
use crate::expr::functor::{BinaryFunctor, TernaryFunctor, UnaryFunctor};
use crate::shape::Layout;

/// A cursor over an expression's elements, addressed by axis.
///
/// A stepper never knows the shape it is being driven against — the driving
/// iterator (see [`crate::iter`]) owns the per-axis index bookkeeping and
/// calls `step`/`reset` when an axis advances or carries. This mirrors the
/// decoupling between cursor and shape algebra that the library's broadcast
/// machinery as a whole depends on.
pub trait Stepper {
    type Value: Element;

    /// Advances one position along `axis`.
    fn step(&mut self, axis: usize);
    /// Advances `n` positions along `axis`.
    fn step_n(&mut self, axis: usize, n: usize);
    /// Retreats one position along `axis`.
    fn step_back(&mut self, axis: usize);
    /// Retreats `n` positions along `axis`.
    fn step_back_n(&mut self, axis: usize, n: usize);
    /// Undoes accumulated forward steps along `axis`, returning to the start
    /// of that axis (called when a forward-iterating axis carries).
    fn reset(&mut self, axis: usize);
    /// The reverse-iteration counterpart of `reset`: returns to the *last*
    /// position of `axis` (called when a backward-iterating axis carries).
    fn reset_back(&mut self, axis: usize);
    /// Seeks to the first element.
    fn to_begin(&mut self);
    /// Seeks one past the last element, visitation order determined by
    /// `layout` (row-major's fastest axis is the last; column-major's is the
    /// first). Used only to seed reverse linear iteration.
    fn to_end(&mut self, layout: Layout);
    /// Reads the value at the current position.
    fn deref(&self) -> Self::Value;
}

/// A [`Stepper`] over a container's own backing storage can be written
/// through, unlike a stepper composed over an expression node.
pub trait MutStepper: Stepper {
    fn deref_mut(&mut self) -> &mut Self::Value;
}

/// Stepper over a [`crate::container::Container`]'s backing buffer,
/// addressed with strides/backstrides already re-expressed against some
/// broadcast target shape.
#[derive(Debug)]
pub struct ContainerStepper<'a, T: Element> {
    base: *const T,
    ptr: *const T,
    strides: crate::shape::Strides,
    backstrides: crate::shape::Backstrides,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Element> ContainerStepper<'a, T> {
    pub fn new(
        ptr: *const T,
        strides: crate::shape::Strides,
        backstrides: crate::shape::Backstrides,
    ) -> Self {
        ContainerStepper {
            base: ptr,
            ptr,
            strides,
            backstrides,
            _marker: PhantomData,
        }
    }

    fn fastest_axis(&self, layout: Layout) -> Option<usize> {
        let ndim = self.strides.ndim();
        if ndim == 0 {
            return None;
        }
        Some(match layout {
            Layout::ColumnMajor => 0,
            Layout::RowMajor | Layout::Dynamic => ndim - 1,
        })
    }
}

impl<'a, T: Element> Stepper for ContainerStepper<'a, T> {
    type Value = T;

    fn step(&mut self, axis: usize) {
        // SAFETY: callers (broadcast/linear iterators) only step within the
        // bounds implied by the target shape this stepper was built for.
        self.ptr = unsafe { self.ptr.offset(self.strides[axis]) };
    }

    fn step_n(&mut self, axis: usize, n: usize) {
        self.ptr = unsafe { self.ptr.offset(self.strides[axis] * n as isize) };
    }

    fn step_back(&mut self, axis: usize) {
        self.ptr = unsafe { self.ptr.offset(-self.strides[axis]) };
    }

    fn step_back_n(&mut self, axis: usize, n: usize) {
        self.ptr = unsafe { self.ptr.offset(-self.strides[axis] * n as isize) };
    }

    fn reset(&mut self, axis: usize) {
        self.ptr = unsafe { self.ptr.offset(-self.backstrides[axis]) };
    }

    fn reset_back(&mut self, axis: usize) {
        self.ptr = unsafe { self.ptr.offset(self.backstrides[axis]) };
    }

    fn to_begin(&mut self) {
        self.ptr = self.base;
    }

    fn to_end(&mut self, layout: Layout) {
        self.to_begin();
        for axis in 0..self.strides.ndim() {
            self.ptr = unsafe { self.ptr.offset(self.backstrides[axis]) };
        }
        match self.fastest_axis(layout) {
            Some(axis) => self.step(axis),
            // 0-dim: the single element is both begin and (pre-)end.
            None => self.ptr = unsafe { self.ptr.offset(1) },
        }
    }

    fn deref(&self) -> T {
        // SAFETY: `ptr` stays within the buffer for any in-bounds iteration
        // sequence driven by a consistent target shape.
        unsafe { *self.ptr }
    }
}

impl<'a, T: Element> PartialEq for ContainerStepper<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.strides == other.strides && self.backstrides == other.backstrides
    }
}

impl<'a, T: Element> MutStepper for ContainerStepper<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: see `deref`; `ptr` was derived from a `*mut T` upstream
        // (`Container::at_unchecked_mut` and `stepper_begin` share that
        // provenance through `Buffer::as_mut_ptr`).
        unsafe { &mut *self.ptr.cast_mut() }
    }
}

/// Composes a [`Stepper`] with a pure unary functor.
pub struct UnaryNodeStepper<S, F> {
    child: S,
    _marker: PhantomData<F>,
}

impl<S, F> UnaryNodeStepper<S, F> {
    pub fn new(child: S) -> Self {
        UnaryNodeStepper {
            child,
            _marker: PhantomData,
        }
    }
}

impl<S: Stepper, F: UnaryFunctor<S::Value>> Stepper for UnaryNodeStepper<S, F> {
    type Value = F::Output;

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
    fn deref(&self) -> Self::Value {
        F::eval(self.child.deref())
    }
}

/// Composes two [`Stepper`]s with a pure binary functor Both
/// children are stepped independently since broadcasting may give them
/// different effective strides.
pub struct BinaryNodeStepper<SA, SB, F> {
    lhs: SA,
    rhs: SB,
    _marker: PhantomData<F>,
}

impl<SA, SB, F> BinaryNodeStepper<SA, SB, F> {
    pub fn new(lhs: SA, rhs: SB) -> Self {
        BinaryNodeStepper {
            lhs,
            rhs,
            _marker: PhantomData,
        }
    }
}

impl<SA, SB, F> Stepper for BinaryNodeStepper<SA, SB, F>
where
    SA: Stepper,
    SB: Stepper,
    F: BinaryFunctor<SA::Value, SB::Value>,
{
    type Value = F::Output;

    fn step(&mut self, axis: usize) {
        self.lhs.step(axis);
        self.rhs.step(axis);
    }
    fn step_n(&mut self, axis: usize, n: usize) {
        self.lhs.step_n(axis, n);
        self.rhs.step_n(axis, n);
    }
    fn step_back(&mut self, axis: usize) {
        self.lhs.step_back(axis);
        self.rhs.step_back(axis);
    }
    fn step_back_n(&mut self, axis: usize, n: usize) {
        self.lhs.step_back_n(axis, n);
        self.rhs.step_back_n(axis, n);
    }
    fn reset(&mut self, axis: usize) {
        self.lhs.reset(axis);
        self.rhs.reset(axis);
    }
    fn reset_back(&mut self, axis: usize) {
        self.lhs.reset_back(axis);
        self.rhs.reset_back(axis);
    }
    fn to_begin(&mut self) {
        self.lhs.to_begin();
        self.rhs.to_begin();
    }
    fn to_end(&mut self, layout: Layout) {
        self.lhs.to_end(layout);
        self.rhs.to_end(layout);
    }
    fn deref(&self) -> Self::Value {
        F::eval(self.lhs.deref(), self.rhs.deref())
    }
}

/// Composes three [`Stepper`]s with a pure ternary functor.
pub struct TernaryNodeStepper<SA, SB, SC, F> {
    a: SA,
    b: SB,
    c: SC,
    _marker: PhantomData<F>,
}

impl<SA, SB, SC, F> TernaryNodeStepper<SA, SB, SC, F> {
    pub fn new(a: SA, b: SB, c: SC) -> Self {
        TernaryNodeStepper {
            a,
            b,
            c,
            _marker: PhantomData,
        }
    }
}

impl<SA, SB, SC, F> Stepper for TernaryNodeStepper<SA, SB, SC, F>
where
    SA: Stepper,
    SB: Stepper,
    SC: Stepper,
    F: TernaryFunctor<SA::Value, SB::Value, SC::Value>,
{
    type Value = F::Output;

    fn step(&mut self, axis: usize) {
        self.a.step(axis);
        self.b.step(axis);
        self.c.step(axis);
    }
    fn step_n(&mut self, axis: usize, n: usize) {
        self.a.step_n(axis, n);
        self.b.step_n(axis, n);
        self.c.step_n(axis, n);
    }
    fn step_back(&mut self, axis: usize) {
        self.a.step_back(axis);
        self.b.step_back(axis);
        self.c.step_back(axis);
    }
    fn step_back_n(&mut self, axis: usize, n: usize) {
        self.a.step_back_n(axis, n);
        self.b.step_back_n(axis, n);
        self.c.step_back_n(axis, n);
    }
    fn reset(&mut self, axis: usize) {
        self.a.reset(axis);
        self.b.reset(axis);
        self.c.reset(axis);
    }
    fn reset_back(&mut self, axis: usize) {
        self.a.reset_back(axis);
        self.b.reset_back(axis);
        self.c.reset_back(axis);
    }
    fn to_begin(&mut self) {
        self.a.to_begin();
        self.b.to_begin();
        self.c.to_begin();
    }
    fn to_end(&mut self, layout: Layout) {
        self.a.to_end(layout);
        self.b.to_end(layout);
        self.c.to_end(layout);
    }
    fn deref(&self) -> Self::Value {
        F::eval(self.a.deref(), self.b.deref(), self.c.deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Backstrides, Strides};

    #[test]
    fn container_stepper_walks_row_major_strides() {
        let data = [0i32, 1, 2, 3, 4, 5];
        let strides = Strides::new(&[3, 1]);
        let backstrides = Backstrides::new(&[3, 2]);
        let mut s = ContainerStepper::new(data.as_ptr(), strides, backstrides);
        assert_eq!(s.deref(), 0);
        s.step(1);
        assert_eq!(s.deref(), 1);
        s.step(1);
        assert_eq!(s.deref(), 2);
        s.reset(1);
        assert_eq!(s.deref(), 0);
        s.step(0);
        assert_eq!(s.deref(), 3);
    }

    #[test]
    fn to_end_is_one_past_to_begin() {
        let data = [0i32, 1, 2, 3];
        let strides = Strides::new(&[2, 1]);
        let backstrides = Backstrides::new(&[2, 1]);
        let mut s = ContainerStepper::new(data.as_ptr(), strides, backstrides);
        s.to_end(Layout::RowMajor);
        s.step_back(1);
        assert_eq!(s.deref(), 3);
    }
}

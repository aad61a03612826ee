//! Iterators. [`LinearIter`]/[`LinearIterMut`] walk a container's flat
//! buffer directly (used by [`crate::container::Container`] and the
//! assignment engine's fast path); [`BroadcastIter`] walks any
//! [`crate::expr::Expression`] re-indexed against a broadcast target shape.

use smallvec::SmallVec;

use crate::shape::{Layout, Shape};
use crate::stepper::Stepper;

/// Flat, contiguous iteration over a container's own storage order. Not
/// broadcast-aware — used only where an expression's natural storage order
/// is already the order the caller wants.
pub struct LinearIter<'a, T> {
    slice: &'a [T],
    front: usize,
    back: usize,
}

impl<'a, T> LinearIter<'a, T> {
    pub fn new(slice: &'a [T]) -> Self {
        LinearIter {
            slice,
            front: 0,
            back: slice.len(),
        }
    }
}

impl<'a, T> Iterator for LinearIter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<&'a T> {
        if self.front >= self.back {
            return None;
        }
        let v = &self.slice[self.front];
        self.front += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<'a, T> DoubleEndedIterator for LinearIter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(&self.slice[self.back])
    }
}

impl<'a, T> ExactSizeIterator for LinearIter<'a, T> {}

/// Mutable counterpart of [`LinearIter`].
pub struct LinearIterMut<'a, T> {
    slice: &'a mut [T],
    front: usize,
    back: usize,
}

impl<'a, T> LinearIterMut<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        let back = slice.len();
        LinearIterMut {
            slice,
            front: 0,
            back,
        }
    }
}

impl<'a, T> Iterator for LinearIterMut<'a, T> {
    type Item = &'a mut T;
    fn next(&mut self) -> Option<&'a mut T> {
        if self.front >= self.back {
            return None;
        }
        let idx = self.front;
        self.front += 1;
        // SAFETY: `idx` is in `[0, self.back)`, disjoint from every other
        // index this iterator has yielded or will yield, and `self.slice`
        // outlives `'a`.
        let ptr = unsafe { self.slice.as_mut_ptr().add(idx) };
        Some(unsafe { &mut *ptr })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<'a, T> ExactSizeIterator for LinearIterMut<'a, T> {}

type IndexVec = SmallVec<[usize; 4]>;

/// Broadcast-aware forward iterator over a [`Stepper`].
///
/// Exhaustion is tracked by this iterator's own index vector, never by
/// comparing the stepper's internal pointer/index state against a sentinel
/// "end" stepper — a stepper has no notion of which target shape it was
/// built for, so it cannot answer "am I done" on its own.
pub struct BroadcastIter<S: Stepper> {
    stepper: S,
    target_shape: Shape,
    index: IndexVec,
    layout: Layout,
    done: bool,
}

impl<S: Stepper> BroadcastIter<S> {
    pub fn new(stepper: S, target_shape: Shape, layout: Layout) -> Self {
        let ndim = target_shape.ndim();
        let done = target_shape.dims().iter().any(|&d| d == 0);
        BroadcastIter {
            stepper,
            target_shape,
            index: smallvec::smallvec![0usize; ndim],
            layout,
            done,
        }
    }

    fn advance(&mut self) {
        let ndim = self.index.len();
        if ndim == 0 {
            self.done = true;
            return;
        }
        let dims = self.target_shape.dims();

        let axis_order: Box<dyn Iterator<Item = usize>> = match self.layout {
            Layout::ColumnMajor => Box::new(0..ndim),
            Layout::RowMajor | Layout::Dynamic => Box::new((0..ndim).rev()),
        };

        for axis in axis_order {
            self.index[axis] += 1;
            if self.index[axis] < dims[axis] {
                self.stepper.step(axis);
                return;
            }
            self.index[axis] = 0;
            self.stepper.reset(axis);
        }
        self.done = true;
    }
}

impl<S: Stepper> Iterator for BroadcastIter<S> {
    type Item = S::Value;

    fn next(&mut self) -> Option<S::Value> {
        if self.done {
            return None;
        }
        let v = self.stepper.deref();
        self.advance();
        Some(v)
    }
}

impl<S: Stepper + PartialEq> PartialEq for BroadcastIter<S> {
    /// Equality compares this iterator's target shape and positional state
    /// against `other`'s — never a field against itself.
    fn eq(&self, other: &Self) -> bool {
        self.target_shape == other.target_shape
            && self.index == other.index
            && self.done == other.done
            && self.stepper == other.stepper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Backstrides, Strides};
    use crate::stepper::ContainerStepper;

    #[test]
    fn linear_iter_yields_in_storage_order() {
        let data = [1, 2, 3, 4];
        let it = LinearIter::new(&data);
        assert_eq!(it.copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn linear_iter_mut_writes_through() {
        let mut data = [1, 2, 3];
        for v in LinearIterMut::new(&mut data) {
            *v *= 10;
        }
        assert_eq!(data, [10, 20, 30]);
    }

    #[test]
    fn broadcast_iter_visits_every_target_cell() {
        let data = [1i32, 2, 3];
        let strides = Strides::new(&[0, 1]);
        let backstrides = Backstrides::new(&[0, 2]);
        let stepper = ContainerStepper::new(data.as_ptr(), strides, backstrides);
        let target = Shape::new(&[2, 3]);
        let it = BroadcastIter::new(stepper, target, Layout::RowMajor);
        assert_eq!(it.collect::<Vec<_>>(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn broadcast_iter_over_empty_axis_yields_nothing() {
        let data: [i32; 0] = [];
        let strides = Strides::new(&[0, 0]);
        let backstrides = Backstrides::new(&[0, 0]);
        let stepper = ContainerStepper::new(data.as_ptr(), strides, backstrides);
        let target = Shape::new(&[3, 0]);
        let it = BroadcastIter::new(stepper, target, Layout::RowMajor);
        assert_eq!(it.count(), 0);
    }
}

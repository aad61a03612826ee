//! Dense container: owns a flat, aligned buffer and exposes
//! shape/strides/backstrides/layout. The only `Expression` that owns data
//! instead of forwarding to children.

use crate::element::Element;
use crate::error::Error;
use crate::expr::Expression;
use crate::iter::{BroadcastIter, LinearIter, LinearIterMut};
use crate::memory::BufferBuilder;
use crate::memory::buffer::Buffer;
use crate::shape::{Backstrides, Layout, Shape, Strides, backstrides_for, broadcast_strides};
use crate::stepper::ContainerStepper;

/// A dense, owned, strided n-dimensional array of `T`.
///
/// Invariant: `buffer` holds exactly `shape.data_size()`
/// elements at all times the container is observable. Shapes with a
/// zero-extent axis hold no backing allocation at all (`buffer` is `None`)
/// since [`Buffer`] disallows zero-element allocations.
#[derive(Debug)]
pub struct Container<T: Element> {
    shape: Shape,
    strides: Strides,
    backstrides: Backstrides,
    layout: Layout,
    buffer: Option<Buffer<T>>,
}

impl<T: Element> Container<T> {
    /// Allocates a container of `shape`, with strides computed from
    /// `layout`. Contents are zero-initialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the backing buffer allocation
    /// is refused.
    pub fn new(shape: Shape, layout: Layout) -> Result<Self, Error> {
        let strides = layout.strides_for(&shape);
        Self::from_parts(shape, strides, layout)
    }

    /// Allocates a container of `shape` and fills every element with
    /// `value`.
    pub fn new_filled(shape: Shape, value: T, layout: Layout) -> Result<Self, Error> {
        let mut c = Self::new(shape, layout)?;
        if let Some(buf) = c.buffer.as_mut() {
            buf.as_slice_mut().fill(value);
        }
        Ok(c)
    }

    /// Allocates a container of `shape` with caller-specified `strides`.
    /// The resulting layout is [`Layout::Dynamic`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `strides.ndim() !=
    /// shape.ndim()`, or [`Error::AllocationFailed`] on OOM.
    pub fn new_with_strides(shape: Shape, strides: Strides) -> Result<Self, Error> {
        if strides.ndim() != shape.ndim() {
            return Err(Error::DimensionMismatch {
                shape_ndim: shape.ndim(),
                strides_ndim: strides.ndim(),
            });
        }
        Self::from_parts(shape, strides, Layout::Dynamic)
    }

    /// Allocates a container of `shape` and fills it by calling `f` with
    /// each element's multi-index, in row-major visitation order.
    ///
    /// Grounded on `xarray_base.hpp`'s element-wise builder idiom.
    pub fn from_shape_with(
        shape: Shape,
        layout: Layout,
        mut f: impl FnMut(&[usize]) -> T,
    ) -> Result<Self, Error> {
        let mut c = Self::new(shape, layout)?;
        let dims = c.shape.dims().to_vec();
        if dims.iter().any(|&d| d == 0) {
            return Ok(c);
        }
        let mut index = vec![0usize; dims.len()];
        if dims.is_empty() {
            let v = f(&index);
            c.buffer.as_mut().unwrap().as_slice_mut()[0] = v;
            return Ok(c);
        }
        'outer: loop {
            let v = f(&index);
            let off = crate::shape::data_offset(&c.strides, &index) as usize;
            c.buffer.as_mut().unwrap().as_slice_mut()[off] = v;

            for axis in (0..dims.len()).rev() {
                index[axis] += 1;
                if index[axis] < dims[axis] {
                    continue 'outer;
                }
                index[axis] = 0;
                if axis == 0 {
                    break 'outer;
                }
            }
        }
        Ok(c)
    }

    fn from_parts(shape: Shape, strides: Strides, layout: Layout) -> Result<Self, Error> {
        let backstrides = backstrides_for(&shape, &strides);
        let numel = shape.data_size();
        let buffer = if numel == 0 {
            None
        } else {
            Some(BufferBuilder::new(numel).build::<T>()?)
        };
        Ok(Container {
            shape,
            strides,
            backstrides,
            layout,
            buffer,
        })
    }

    /// Reshapes to `shape`, recomputing strides from the container's
    /// current layout. A no-op if `shape` is unchanged. Existing elements
    /// are not preserved.
    pub fn reshape_shape(&mut self, shape: Shape) -> Result<(), Error> {
        let effective_layout = match self.layout {
            Layout::Dynamic => Layout::RowMajor,
            other => other,
        };
        self.reshape_with_layout(shape, effective_layout)
    }

    /// Reshapes to `shape` under `layout`. A no-op if `shape` is unchanged.
    pub fn reshape_with_layout(&mut self, shape: Shape, layout: Layout) -> Result<(), Error> {
        if shape == self.shape {
            return Ok(());
        }
        let strides = layout.strides_for(&shape);
        *self = Self::from_parts(shape, strides, layout)?;
        Ok(())
    }

    /// Reshapes to `shape` with caller-specified `strides`. A no-op if
    /// `shape` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `strides.ndim() !=
    /// shape.ndim()`.
    pub fn reshape_with_strides(&mut self, shape: Shape, strides: Strides) -> Result<(), Error> {
        if shape == self.shape {
            return Ok(());
        }
        if strides.ndim() != shape.ndim() {
            return Err(Error::DimensionMismatch {
                shape_ndim: shape.ndim(),
                strides_ndim: strides.ndim(),
            });
        }
        *self = Self::from_parts(shape, strides, Layout::Dynamic)?;
        Ok(())
    }

    /// Bounds-checked multi-index element access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if any index is at or beyond the
    /// corresponding axis's extent.
    pub fn at(&self, indices: &[usize]) -> Result<&T, Error> {
        self.check_indices(indices)?;
        // SAFETY: bounds were just validated.
        Ok(unsafe { self.at_unchecked(indices) })
    }

    /// Bounds-checked mutable multi-index element access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if any index is at or beyond the
    /// corresponding axis's extent.
    pub fn at_mut(&mut self, indices: &[usize]) -> Result<&mut T, Error> {
        self.check_indices(indices)?;
        // SAFETY: bounds were just validated.
        Ok(unsafe { self.at_unchecked_mut(indices) })
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), Error> {
        let ndim = self.shape.ndim();
        let skip = ndim - indices.len();
        for (i, &idx) in indices.iter().enumerate() {
            let axis = skip + i;
            let extent = self.shape.dims()[axis];
            if idx >= extent {
                return Err(Error::IndexOutOfRange {
                    axis,
                    index: idx,
                    extent,
                });
            }
        }
        Ok(())
    }

    /// Offset for a broadcast-target index: any axis whose own extent is 1
    /// reads position 0 regardless of the index given for it, since that
    /// axis's stride is already canonicalized to 0. Unlike [`Container::at`],
    /// this never bounds-checks a non-unit axis — callers (the `Expression`
    /// impl below, driven by [`crate::assign`]'s broadcast traversal) only
    /// ever pass indices ranging over a shape this container has already
    /// been broadcast against.
    fn broadcast_offset(&self, indices: &[usize]) -> isize {
        let ndim = self.shape.ndim();
        let skip = ndim - indices.len();
        indices
            .iter()
            .enumerate()
            .map(|(i, &idx)| {
                let axis = skip + i;
                let clamped = if self.shape.dims()[axis] == 1 { 0 } else { idx };
                self.strides[axis] * clamped as isize
            })
            .sum()
    }

    /// Unchecked multi-index element access.
    ///
    /// # Safety
    ///
    /// Every index must be within the extent of its corresponding axis.
    pub unsafe fn at_unchecked(&self, indices: &[usize]) -> &T {
        let offset = crate::shape::data_offset(&self.strides, indices);
        let buf = self.buffer.as_ref().expect("valid index implies nonzero shape");
        // SAFETY: caller guarantees `indices` are in-bounds, so `offset` is
        // within `buf`'s allocated region.
        unsafe { &*buf.as_ptr().offset(offset) }
    }

    /// Unchecked mutable multi-index element access.
    ///
    /// # Safety
    ///
    /// Every index must be within the extent of its corresponding axis.
    pub unsafe fn at_unchecked_mut(&mut self, indices: &[usize]) -> &mut T {
        let offset = crate::shape::data_offset(&self.strides, indices);
        let buf = self.buffer.as_mut().expect("valid index implies nonzero shape");
        // SAFETY: caller guarantees `indices` are in-bounds, so `offset` is
        // within `buf`'s allocated region.
        unsafe { &mut *buf.as_mut_ptr().offset(offset) }
    }

    /// Linear (flat-buffer) iterator over elements in storage order.
    pub fn iter(&self) -> LinearIter<'_, T> {
        LinearIter::new(self.buffer.as_ref().map_or(&[], Buffer::as_slice))
    }

    /// Mutable linear iterator over elements in storage order.
    pub fn iter_mut(&mut self) -> LinearIterMut<'_, T> {
        LinearIterMut::new(match self.buffer.as_mut() {
            Some(b) => b.as_slice_mut(),
            None => &mut [],
        })
    }

    /// Broadcast-aware iterator yielding this container's values re-indexed
    /// against `target_shape`.
    pub fn broadcast_iter(&self, target_shape: &Shape) -> BroadcastIter<ContainerStepper<'_, T>> {
        let stepper = self.stepper_begin(target_shape);
        BroadcastIter::new(stepper, target_shape.clone(), self.layout_for_iteration())
    }

    /// Builds a stepper seeded at the start of this container, with its
    /// strides/backstrides re-expressed against `target_shape`. Axes of
    /// `target_shape` absent from this container's own shape get stride 0,
    /// so stepping them is a no-op.
    pub fn stepper_begin(&self, target_shape: &Shape) -> ContainerStepper<'_, T> {
        let strides = broadcast_strides(target_shape, &self.shape, &self.strides);
        let backstrides = backstrides_for(target_shape, &strides);
        ContainerStepper::new(
            self.buffer.as_ref().map_or(std::ptr::null(), Buffer::as_ptr),
            strides,
            backstrides,
        )
    }

    fn layout_for_iteration(&self) -> Layout {
        match self.layout {
            Layout::Dynamic => Layout::RowMajor,
            other => other,
        }
    }

    /// Reverses shape and stride order. Zero-copy: the same buffer is
    /// reinterpreted, not moved or copied.
    ///
    /// `c.transpose().transpose()` is equal to `c` under element access,
    /// since reversing axis order twice is the identity.
    #[must_use]
    pub fn transpose(self) -> Self {
        let shape = self.shape.transpose();
        let strides = self.strides.reversed();
        let backstrides = self.backstrides.reversed();
        Container {
            shape,
            strides,
            backstrides,
            layout: Layout::Dynamic,
            buffer: self.buffer,
        }
    }

    /// Raw strides.
    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    /// Raw backstrides.
    pub fn backstrides(&self) -> &Backstrides {
        &self.backstrides
    }

    /// The layout this container was constructed/reshaped with.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Total element count.
    pub fn size(&self) -> usize {
        self.shape.data_size()
    }
}

impl<T: Element, const D: usize> std::ops::Index<[usize; D]> for Container<T> {
    type Output = T;
    fn index(&self, index: [usize; D]) -> &T {
        self.at(&index).expect("index out of range")
    }
}

impl<T: Element, const D: usize> std::ops::IndexMut<[usize; D]> for Container<T> {
    fn index_mut(&mut self, index: [usize; D]) -> &mut T {
        self.at_mut(&index).expect("index out of range")
    }
}

impl<T: Element> Expression for Container<T> {
    type Value = T;
    type Stepper<'a>
        = ContainerStepper<'a, T>
    where
        Self: 'a;

    fn dimension(&self) -> usize {
        self.shape.ndim()
    }

    fn shape(&self) -> Shape {
        self.shape.clone()
    }

    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error> {
        crate::shape::broadcast_shape(&self.shape, output)
    }

    fn is_trivial_broadcast(&self, strides: &Strides) -> bool {
        crate::shape::check_trivial_broadcast(&self.strides, strides)
    }

    fn at(&self, indices: &[usize]) -> T {
        let offset = self.broadcast_offset(indices);
        let buf = self
            .buffer
            .as_ref()
            .expect("broadcasting over a zero-extent axis visits nothing");
        // SAFETY: every non-unit axis of `indices` was bounds-guaranteed by
        // the broadcast target shape the caller built `indices` against;
        // unit axes are clamped to 0 in `broadcast_offset` regardless of
        // what index was supplied for them.
        unsafe { *buf.as_ptr().offset(offset) }
    }

    fn stepper_begin(&self, target_shape: &Shape) -> ContainerStepper<'_, T> {
        Container::stepper_begin(self, target_shape)
    }
}

/// A borrowed container is itself an expression — this is what lets
/// `&a + &b` build a lazy node without moving `a`/`b`.
impl<'c, T: Element> Expression for &'c Container<T> {
    type Value = T;
    type Stepper<'a>
        = ContainerStepper<'a, T>
    where
        Self: 'a;

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn broadcast_shape(&self, output: &mut Shape) -> Result<bool, Error> {
        (**self).broadcast_shape(output)
    }

    fn is_trivial_broadcast(&self, strides: &Strides) -> bool {
        (**self).is_trivial_broadcast(strides)
    }

    fn at(&self, indices: &[usize]) -> T {
        (**self).at(indices)
    }

    fn stepper_begin(&self, target_shape: &Shape) -> ContainerStepper<'_, T> {
        Container::stepper_begin(self, target_shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Layout as Lay;

    #[test]
    fn new_zero_initializes() {
        let c = Container::<f64>::new(Shape::new(&[2, 2]), Lay::RowMajor).unwrap();
        assert_eq!(c.at(&[0, 0]), Ok(&0.0));
    }

    #[test]
    fn new_filled_sets_every_element() {
        let c = Container::new_filled(Shape::new(&[2, 3]), 7_i32, Lay::RowMajor).unwrap();
        assert!(c.iter().all(|&v| v == 7));
    }

    #[test]
    fn at_mut_writes_through() {
        let mut c = Container::<i32>::new(Shape::new(&[2, 2]), Lay::RowMajor).unwrap();
        *c.at_mut(&[1, 1]).unwrap() = 9;
        assert_eq!(c[[1, 1]], 9);
    }

    #[test]
    fn checked_access_reports_out_of_range() {
        let c = Container::<i32>::new(Shape::new(&[2, 2]), Lay::RowMajor).unwrap();
        assert_eq!(
            c.at(&[2, 0]),
            Err(Error::IndexOutOfRange {
                axis: 0,
                index: 2,
                extent: 2
            })
        );
    }

    #[test]
    fn trailing_axis_access_with_fewer_indices() {
        let c = Container::from_shape_with(Shape::new(&[2, 3]), Lay::RowMajor, |idx| {
            (idx[0] * 10 + idx[1]) as i32
        })
        .unwrap();
        // one index addresses the front (row) of the array.
        assert_eq!(c.at(&[1]), Ok(&10));
    }

    #[test]
    fn reshape_same_shape_is_noop() {
        let mut c = Container::new_filled(Shape::new(&[2, 2]), 5_i32, Lay::RowMajor).unwrap();
        c.reshape_shape(Shape::new(&[2, 2])).unwrap();
        assert_eq!(c.at(&[0, 0]), Ok(&5));
    }

    #[test]
    fn reshape_different_shape_clears_contents() {
        let mut c = Container::new_filled(Shape::new(&[2, 2]), 5_i32, Lay::RowMajor).unwrap();
        c.reshape_shape(Shape::new(&[3, 3])).unwrap();
        assert_eq!(c.size(), 9);
        assert_eq!(c.at(&[0, 0]), Ok(&0));
    }

    #[test]
    fn reshape_with_mismatched_strides_errors() {
        let mut c = Container::<i32>::new(Shape::new(&[2, 2]), Lay::RowMajor).unwrap();
        let err = c
            .reshape_with_strides(Shape::new(&[3, 3]), Strides::new(&[1]))
            .unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                shape_ndim: 2,
                strides_ndim: 1
            }
        );
    }

    #[test]
    fn zero_extent_shape_has_no_buffer_but_valid_size() {
        let c = Container::<i32>::new(Shape::new(&[3, 0]), Lay::RowMajor).unwrap();
        assert_eq!(c.size(), 0);
        assert_eq!(c.iter().count(), 0);
    }

    #[test]
    fn transpose_twice_is_identity() {
        let c = Container::from_shape_with(Shape::new(&[2, 3]), Lay::RowMajor, |idx| {
            (idx[0] * 10 + idx[1]) as i32
        })
        .unwrap();
        let original_strides = c.strides().clone();
        let back = c.transpose().transpose();
        assert_eq!(back.shape(), Shape::new(&[2, 3]));
        assert_eq!(back.strides(), &original_strides);
        assert_eq!(back.at(&[1, 2]), Ok(&12));
    }

    #[test]
    fn transpose_reverses_strides() {
        let c = Container::<i32>::new(Shape::new(&[2, 3]), Lay::RowMajor).unwrap();
        let t = c.transpose();
        assert_eq!(t.shape(), Shape::new(&[3, 2]));
    }

    proptest::proptest! {
        #[test]
        fn transpose_twice_preserves_every_element(
            rows in 1usize..6,
            cols in 1usize..6,
            fill in -1000i32..1000,
        ) {
            let c = Container::new_filled(Shape::new(&[rows, cols]), fill, Lay::RowMajor).unwrap();
            let back = c.transpose().transpose();
            proptest::prop_assert_eq!(back.shape(), Shape::new(&[rows, cols]));
            for r in 0..rows {
                for col in 0..cols {
                    proptest::prop_assert_eq!(back.at(&[r, col]), Ok(&fill));
                }
            }
        }

        #[test]
        fn reshape_to_current_shape_is_always_a_noop(
            rows in 1usize..6,
            cols in 1usize..6,
            fill in -1000i32..1000,
        ) {
            let mut c = Container::new_filled(Shape::new(&[rows, cols]), fill, Lay::RowMajor).unwrap();
            c.reshape_shape(Shape::new(&[rows, cols])).unwrap();
            proptest::prop_assert_eq!(c.at(&[0, 0]), Ok(&fill));
            proptest::prop_assert_eq!(c.size(), rows * cols);
        }
    }
}

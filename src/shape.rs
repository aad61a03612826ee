//! Shape, strides, backstrides and the broadcasting algebra.
//!
//! # Broadcasting semantics
//!
//! Two shapes are broadcast-compatible if, walking both from the trailing
//! axis, every pair of extents is either equal, or one of them is 1, or the
//! shorter shape has run out of axes (a missing leading axis behaves as 1).
//! The broadcast result takes the larger extent at each axis.

use smallvec::{SmallVec, smallvec};

use crate::error::Error;

type AxisVec<T> = SmallVec<[T; 4]>;

/// Ordered sequence of non-negative axis extents. Length equals dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Shape(AxisVec<usize>);

/// Ordered sequence of signed per-axis strides (step in the flat buffer per
/// unit advance along that axis). Axes whose extent is 1 are canonicalized
/// to stride 0 wherever a `Shape` is available to canonicalize against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Strides(AxisVec<isize>);

/// Derived from shape and strides: `backstrides[k] = strides[k] * (shape[k]
/// - 1)` when `shape[k] > 1`, else 0. Used to rewind a stepper at axis
/// carry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Backstrides(AxisVec<isize>);

/// Stride convention used by a freshly allocated [`crate::container::Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Last axis varies fastest; strides decrease left to right.
    RowMajor,
    /// First axis varies fastest; strides increase left to right.
    ColumnMajor,
    /// Arbitrary stride arrangement (views, broadcast results, user-supplied
    /// strides).
    Dynamic,
}

impl Shape {
    /// Builds a shape from a slice of extents.
    pub fn new(dims: &[usize]) -> Self {
        Shape(dims.iter().copied().collect())
    }

    /// Number of axes (rank). A 0-dim (scalar) shape has `ndim() == 0`.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// The extents, trailing-axis ordered (axis 0 is the slowest axis).
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total element count: the product of extents, or 1 for the empty
    /// (0-dim) shape.
    pub fn data_size(&self) -> usize {
        self.0.iter().product()
    }

    /// Reverses axis order (used by [`crate::container::Container::transpose`]).
    #[must_use]
    pub fn transpose(&self) -> Self {
        Shape(self.0.iter().rev().copied().collect())
    }

    /// `true` if this shape paired with `strides` forms a C-contiguous
    /// row-major layout with no gaps.
    pub fn is_row_major(&self, strides: &Strides) -> bool {
        self.contiguous_with(strides, Layout::RowMajor)
    }

    /// Column-major counterpart of [`Shape::is_row_major`].
    pub fn is_column_major(&self, strides: &Strides) -> bool {
        self.contiguous_with(strides, Layout::ColumnMajor)
    }

    fn contiguous_with(&self, strides: &Strides, layout: Layout) -> bool {
        if self.0.len() != strides.0.len() {
            return false;
        }
        layout.strides_for(self) == *strides
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Shape::new(value)
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = usize;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shape({:?})", self.0.as_slice())
    }
}

macro_rules! impl_stride_like {
    ($name:ident) => {
        impl $name {
            /// Builds from a slice of per-axis strides.
            pub fn new(values: &[isize]) -> Self {
                $name(values.iter().copied().collect())
            }

            /// Number of axes.
            #[inline]
            pub fn ndim(&self) -> usize {
                self.0.len()
            }

            /// The per-axis values.
            #[inline]
            pub fn values(&self) -> &[isize] {
                &self.0
            }

            /// Reverses axis order.
            #[must_use]
            pub fn reversed(&self) -> Self {
                $name(self.0.iter().rev().copied().collect())
            }
        }

        impl std::ops::Index<usize> for $name {
            type Output = isize;
            fn index(&self, index: usize) -> &Self::Output {
                &self.0[index]
            }
        }
    };
}

impl_stride_like!(Strides);
impl_stride_like!(Backstrides);

impl Layout {
    /// Computes canonical strides for `shape` under this layout.
    ///
    /// Row-major: the last axis has stride 1, each preceding stride is the
    /// next axis's extent times the next axis's stride. Column-major is the
    /// mirror image. Any axis whose extent is 1 is canonicalized to stride
    /// 0, which is what makes broadcasting zero-copy.
    ///
    /// # Panics
    ///
    /// Panics if called with `Layout::Dynamic` — dynamic layouts have no
    /// canonical stride formula; construct strides directly instead.
    pub fn strides_for(self, shape: &Shape) -> Strides {
        let dims = shape.dims();
        let n = dims.len();
        let mut strides = smallvec![0isize; n];
        match self {
            Layout::RowMajor => {
                let mut acc: isize = 1;
                for k in (0..n).rev() {
                    strides[k] = if dims[k] == 1 { 0 } else { acc };
                    acc *= dims[k] as isize;
                }
            }
            Layout::ColumnMajor => {
                let mut acc: isize = 1;
                for k in 0..n {
                    strides[k] = if dims[k] == 1 { 0 } else { acc };
                    acc *= dims[k] as isize;
                }
            }
            Layout::Dynamic => {
                panic!("Layout::Dynamic has no canonical stride formula")
            }
        }
        Strides(strides)
    }
}

/// Derives backstrides from a shape/strides pair: `strides[k] *
/// (shape[k] - 1)` when `shape[k] > 1`, else 0.
pub fn backstrides_for(shape: &Shape, strides: &Strides) -> Backstrides {
    let out = shape
        .dims()
        .iter()
        .zip(strides.values())
        .map(|(&extent, &stride)| {
            if extent > 1 {
                stride * (extent as isize - 1)
            } else {
                0
            }
        })
        .collect();
    Backstrides(out)
}

/// Trailing-axis address folding: folds `sum(strides[i] *
/// indices[i])` over the last `indices.len()` axes of `strides`. If fewer
/// indices than axes are given, the leading axes are treated as 0 — calling
/// with fewer than the full rank addresses the "front" of the array.
pub fn data_offset(strides: &Strides, indices: &[usize]) -> isize {
    let n = strides.ndim();
    let k = indices.len();
    debug_assert!(k <= n, "more indices than axes");
    let skip = n - k;
    indices
        .iter()
        .enumerate()
        .map(|(i, &idx)| strides[skip + i] * idx as isize)
        .sum()
}

/// Broadcasts `input`'s shape into `output` in place.
///
/// Walks both shapes from the trailing axis. At each position: if `output`'s
/// extent is 1, it is replaced by `input`'s extent; else if `input`'s extent
/// is neither 1 nor equal to `output`'s extent, fails with
/// [`Error::BroadcastIncompatible`]. If `input` is shorter than `output`,
/// the missing leading axes behave as 1. If `input` is longer than `output`,
/// `output` is grown with leading 1s first.
///
/// Returns `Ok(true)` iff every position matched exactly — no axis actually
/// broadcast and dimensions were already equal.
pub fn broadcast_shape(input: &Shape, output: &mut Shape) -> Result<bool, Error> {
    let in_len = input.ndim();
    if in_len > output.ndim() {
        let mut grown: AxisVec<usize> = smallvec![1usize; in_len - output.ndim()];
        grown.extend(output.0.iter().copied());
        output.0 = grown;
    }
    let out_len = output.ndim();
    let mut exact = true;

    for k in 0..out_len {
        let out_idx = out_len - 1 - k;
        if k >= in_len {
            // input has no axis here; behaves as 1.
            if output.0[out_idx] != 1 {
                exact = false;
            }
            continue;
        }
        let in_idx = in_len - 1 - k;
        let in_extent = input.0[in_idx];
        let out_extent = output.0[out_idx];

        if out_extent == 1 {
            if in_extent != 1 {
                exact = false;
            }
            output.0[out_idx] = in_extent;
        } else if in_extent == out_extent {
            // already matches; no broadcast on this axis.
        } else if in_extent == 1 {
            exact = false;
        } else {
            return Err(Error::BroadcastIncompatible {
                axis: k,
                lhs_extent: out_extent,
                rhs_extent: in_extent,
            });
        }
    }
    Ok(exact)
}

/// Computes the strides an expression of shape `shape`/`strides` would use
/// when broadcast against `target`. Trailing axes that match `target`
/// extent-for-extent reuse the original stride; every other axis (expanded
/// or a leading axis absent from `shape`) gets stride 0.
pub fn broadcast_strides(target: &Shape, shape: &Shape, strides: &Strides) -> Strides {
    let t_len = target.ndim();
    let s_len = shape.ndim();
    let mut out: AxisVec<isize> = smallvec![0isize; t_len];
    for k in 0..s_len.min(t_len) {
        let t_idx = t_len - 1 - k;
        let s_idx = s_len - 1 - k;
        out[t_idx] = if target.0[t_idx] == shape.0[s_idx] {
            strides[s_idx]
        } else {
            0
        };
    }
    Strides(out)
}

/// `true` iff two (already axis-canonicalized) stride sequences are
/// identical, meaning the strategies they describe can share a single
/// linear pass.
pub fn check_trivial_broadcast(a: &Strides, b: &Strides) -> bool {
    a.0 == b.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_strides_canonicalize_unit_axes() {
        let s = Shape::new(&[1, 2, 3, 4]);
        let strides = Layout::RowMajor.strides_for(&s);
        assert_eq!(strides.values(), &[0, 12, 4, 1]);
    }

    #[test]
    fn column_major_strides() {
        let s = Shape::new(&[2, 3, 4]);
        let strides = Layout::ColumnMajor.strides_for(&s);
        assert_eq!(strides.values(), &[1, 2, 6]);
    }

    #[test]
    fn data_size_of_empty_shape_is_one() {
        assert_eq!(Shape::new(&[]).data_size(), 1);
    }

    #[test]
    fn data_size_with_zero_extent_is_zero() {
        assert_eq!(Shape::new(&[3, 0, 4]).data_size(), 0);
    }

    #[test]
    fn backstrides_derivation() {
        let shape = Shape::new(&[2, 3]);
        let strides = Layout::RowMajor.strides_for(&shape);
        let back = backstrides_for(&shape, &strides);
        assert_eq!(back.values(), &[3, 2]);
    }

    #[test]
    fn backstrides_for_unit_axis_is_zero() {
        let shape = Shape::new(&[1, 3]);
        let strides = Layout::RowMajor.strides_for(&shape);
        let back = backstrides_for(&shape, &strides);
        assert_eq!(back.values(), &[0, 2]);
    }

    #[test]
    fn trailing_axis_address_folding() {
        let strides = Strides::new(&[12, 4, 1]);
        assert_eq!(data_offset(&strides, &[1, 2, 3]), 12 + 8 + 3);
        // fewer indices than axes addresses the front of the array.
        assert_eq!(data_offset(&strides, &[2, 3]), 8 + 3);
        assert_eq!(data_offset(&strides, &[]), 0);
    }

    #[test]
    fn broadcast_equal_shapes_is_exact() {
        let input = Shape::new(&[2, 3]);
        let mut output = Shape::new(&[2, 3]);
        assert_eq!(broadcast_shape(&input, &mut output), Ok(true));
        assert_eq!(output, Shape::new(&[2, 3]));
    }

    #[test]
    fn broadcast_row_vector_against_matrix() {
        let input = Shape::new(&[3]);
        let mut output = Shape::new(&[2, 3]);
        assert_eq!(broadcast_shape(&input, &mut output), Ok(false));
        assert_eq!(output, Shape::new(&[2, 3]));
    }

    #[test]
    fn broadcast_grows_output_rank_for_longer_input() {
        let input = Shape::new(&[2, 3]);
        let mut output = Shape::new(&[3]);
        assert_eq!(broadcast_shape(&input, &mut output), Ok(false));
        assert_eq!(output, Shape::new(&[2, 3]));
    }

    #[test]
    fn broadcast_incompatible_reports_axis_and_extents() {
        let input = Shape::new(&[3, 5]);
        let mut output = Shape::new(&[3, 4]);
        let err = broadcast_shape(&input, &mut output).unwrap_err();
        assert_eq!(
            err,
            Error::BroadcastIncompatible {
                axis: 0,
                lhs_extent: 4,
                rhs_extent: 5,
            }
        );
    }

    #[test]
    fn broadcast_strides_zero_for_expanded_axes() {
        let shape = Shape::new(&[3]);
        let strides = Layout::RowMajor.strides_for(&shape);
        let target = Shape::new(&[2, 3]);
        let out = broadcast_strides(&target, &shape, &strides);
        assert_eq!(out.values(), &[0, 1]);
    }

    #[test]
    fn trivial_broadcast_detects_identical_strides() {
        let shape = Shape::new(&[2, 3]);
        let a = Layout::RowMajor.strides_for(&shape);
        let b = Layout::RowMajor.strides_for(&shape);
        assert!(check_trivial_broadcast(&a, &b));
    }

    #[test]
    fn transpose_reverses_axis_order() {
        let shape = Shape::new(&[2, 3, 4]);
        assert_eq!(shape.transpose(), Shape::new(&[4, 3, 2]));
    }

    #[test]
    fn empty_axis_broadcasts_without_error() {
        let input = Shape::new(&[0]);
        let mut output = Shape::new(&[3, 0]);
        assert_eq!(broadcast_shape(&input, &mut output), Ok(false));
        assert_eq!(output.data_size(), 0);
    }
}

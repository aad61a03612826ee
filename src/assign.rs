//! The assignment engine materializes any [`Expression`] into
//! a [`Container`], choosing a linear fast path when possible and falling
//! back to index-driven traversal otherwise.

use crate::container::Container;
use crate::element::Element;
use crate::error::Error;
use crate::expr::Expression;
use crate::expr::functor::BinaryFunctor;
use crate::expr::node::trailing;
use crate::shape::{Layout, Shape};

/// Visits every multi-index of `shape` in row-major order. A shape with any
/// zero-extent axis visits nothing.
fn for_each_index(shape: &Shape, mut f: impl FnMut(&[usize])) {
    let dims = shape.dims();
    if dims.iter().any(|&d| d == 0) {
        return;
    }
    if dims.is_empty() {
        f(&[]);
        return;
    }
    let mut index = vec![0usize; dims.len()];
    'outer: loop {
        f(&index);
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
}

/// Plain assignment: `lhs` takes on `rhs`'s broadcast shape and every
/// element of `rhs`. Any existing content of `lhs` is discarded, so no
/// temporary is ever needed here — that complication is unique to
/// [`assign_computed`].
///
/// # Errors
///
/// Returns [`Error::BroadcastIncompatible`] if `rhs`'s shape cannot be
/// broadcast against `lhs`'s current shape, or [`Error::AllocationFailed`]
/// if growing `lhs` requires a reallocation that is refused.
pub fn assign<T, R>(lhs: &mut Container<T>, rhs: &R) -> Result<(), Error>
where
    T: Element,
    R: Expression<Value = T>,
{
    // The target shape comes from `rhs` alone: start at all 1s of `rhs`'s
    // own rank and let it broadcast itself into that. Seeding from `lhs`'s
    // existing shape would let stale extents reject a valid overwrite (a
    // same-rank `lhs` of a different extent) or, worse, silently keep a
    // larger pre-existing rank instead of adopting `rhs`'s own.
    let mut target = Shape::new(&vec![1usize; rhs.dimension()]);
    rhs.broadcast_shape(&mut target)?;
    lhs.reshape_shape(target.clone())?;
    copy_broadcast(lhs, rhs, &target);
    Ok(())
}

/// Copies `rhs`'s broadcast-against-`target` values into `lhs`, which must
/// already be shaped exactly as `target`. Shared by [`assign`] (after it has
/// reshaped `lhs` to `rhs`'s own broadcast shape) and [`assign_computed`]'s
/// temporary-insertion branch (where `target` is driven by the *computed*
/// assignment's rules, not `rhs`'s own shape, so the reshape step above
/// doesn't apply).
fn copy_broadcast<T, R>(lhs: &mut Container<T>, rhs: &R, target: &Shape)
where
    T: Element,
    R: Expression<Value = T>,
{
    if rhs.is_trivial_broadcast(lhs.strides()) {
        for (slot, value) in lhs.iter_mut().zip(rhs.broadcast_iter(target)) {
            *slot = value;
        }
    } else {
        let rhs_ndim = rhs.dimension();
        for_each_index(target, |idx| {
            let value = rhs.at(trailing(idx, rhs_ndim));
            *lhs
                .at_mut(idx)
                .expect("idx ranges over the shape lhs was just reshaped to") = value;
        });
    }
}

/// Computed assignment: `lhs = F(lhs, rhs)`, element-wise. Unlike
/// [`assign`], the existing contents of `lhs` participate in the
/// computation, so an axis widening to a larger extent can't just
/// reshape-and-zero `lhs` — the temporary-insertion rule below handles that
/// case. Unlike plain [`assign`], though, a computed assignment can never
/// grow `lhs`'s *rank*: `lhs` has no value to contribute along an axis it
/// doesn't have, so that case is reported as incompatible rather than
/// silently adopting the axis.
///
/// # Errors
///
/// Returns [`Error::BroadcastIncompatible`] if `rhs`'s shape is not
/// broadcast-compatible with `lhs`'s current shape, or if it is compatible
/// only by adding a leading axis `lhs` doesn't have.
pub fn assign_computed<T, R, F>(lhs: &mut Container<T>, rhs: &R) -> Result<(), Error>
where
    T: Element,
    R: Expression,
    F: BinaryFunctor<T, R::Value, Output = T>,
{
    let lhs_shape = lhs.shape();
    let mut target = lhs_shape.clone();
    rhs.broadcast_shape(&mut target)?;

    if target.ndim() != lhs_shape.ndim() {
        return Err(Error::BroadcastIncompatible {
            axis: 0,
            lhs_extent: 1,
            rhs_extent: target.dims()[0],
        });
    }

    if target != lhs.shape() {
        // Temporary-insertion rule: the computed assignment would widen
        // `lhs`'s rank or extent. Broadcast-copy the existing contents into
        // a same-shaped-as-`target` temporary first, combine there, then
        // swap it in — reshaping `lhs` directly would zero it out before
        // its old values could take part in `F`.
        let mut tmp = Container::<T>::new(target.clone(), Layout::RowMajor)?;
        copy_broadcast(&mut tmp, &*lhs, &target);
        combine_in_place::<T, R, F>(&mut tmp, rhs, &target);
        *lhs = tmp;
    } else {
        combine_in_place::<T, R, F>(lhs, rhs, &target);
    }
    Ok(())
}

fn combine_in_place<T, R, F>(lhs: &mut Container<T>, rhs: &R, target: &Shape)
where
    T: Element,
    R: Expression,
    F: BinaryFunctor<T, R::Value, Output = T>,
{
    if rhs.is_trivial_broadcast(lhs.strides()) {
        for (slot, rv) in lhs.iter_mut().zip(rhs.broadcast_iter(target)) {
            *slot = F::eval(*slot, rv);
        }
    } else {
        let rhs_ndim = rhs.dimension();
        for_each_index(target, |idx| {
            let rv = rhs.at(trailing(idx, rhs_ndim));
            // SAFETY: `idx` ranges over `target`, which equals `lhs`'s
            // current shape on every call site of this branch.
            let slot = unsafe { lhs.at_unchecked_mut(idx) };
            *slot = F::eval(*slot, rv);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::expr::functor::Add;
    use crate::shape::Layout as Lay;

    #[test]
    fn assign_copies_equal_shaped_expression() {
        let mut lhs = Container::<i32>::new(Shape::new(&[2, 2]), Lay::RowMajor).unwrap();
        let rhs = Container::from_shape_with(Shape::new(&[2, 2]), Lay::RowMajor, |idx| {
            (idx[0] * 2 + idx[1]) as i32
        })
        .unwrap();
        assign(&mut lhs, &rhs).unwrap();
        assert_eq!(lhs.at(&[1, 1]), Ok(&3));
    }

    #[test]
    fn assign_adopts_rhs_shape_even_if_lhs_was_larger() {
        // `=` takes on `rhs`'s own broadcast shape unconditionally, discarding
        // whatever shape `lhs` had before — it never broadcasts `rhs` up to
        // fit a pre-existing, larger `lhs`.
        let mut lhs = Container::<i32>::new(Shape::new(&[2, 3]), Lay::RowMajor).unwrap();
        let rhs =
            Container::from_shape_with(Shape::new(&[3]), Lay::RowMajor, |idx| idx[0] as i32)
                .unwrap();
        assign(&mut lhs, &rhs).unwrap();
        assert_eq!(lhs.shape(), Shape::new(&[3]));
        assert_eq!(lhs.at(&[2]), Ok(&2));
    }

    #[test]
    fn assign_grows_lhs_to_fit_rhs() {
        let mut lhs = Container::<i32>::new(Shape::new(&[3]), Lay::RowMajor).unwrap();
        let rhs = Container::new_filled(Shape::new(&[2, 3]), 9, Lay::RowMajor).unwrap();
        assign(&mut lhs, &rhs).unwrap();
        assert_eq!(lhs.size(), 6);
    }

    #[test]
    fn assign_computed_adds_in_place_when_shape_unchanged() {
        let mut lhs = Container::new_filled(Shape::new(&[2, 2]), 1_i32, Lay::RowMajor).unwrap();
        let rhs = Container::new_filled(Shape::new(&[2, 2]), 5_i32, Lay::RowMajor).unwrap();
        assign_computed::<_, _, Add>(&mut lhs, &rhs).unwrap();
        assert!(lhs.iter().all(|&v| v == 6));
    }

    #[test]
    fn assign_computed_widens_existing_axis_preserving_old_values() {
        let mut lhs = Container::from_shape_with(Shape::new(&[1, 3]), Lay::RowMajor, |idx| {
            idx[1] as i32
        })
        .unwrap();
        let rhs = Container::new_filled(Shape::new(&[2, 3]), 10_i32, Lay::RowMajor).unwrap();
        assign_computed::<_, _, Add>(&mut lhs, &rhs).unwrap();
        assert_eq!(lhs.shape(), Shape::new(&[2, 3]));
        assert_eq!(lhs.at(&[0, 2]), Ok(&12));
        assert_eq!(lhs.at(&[1, 0]), Ok(&10));
    }

    #[test]
    fn assign_computed_rejects_rank_growth() {
        let mut lhs =
            Container::from_shape_with(Shape::new(&[3]), Lay::RowMajor, |idx| idx[0] as i32)
                .unwrap();
        let rhs = Container::new_filled(Shape::new(&[2, 3]), 10_i32, Lay::RowMajor).unwrap();
        let err = assign_computed::<_, _, Add>(&mut lhs, &rhs).unwrap_err();
        assert_eq!(
            err,
            Error::BroadcastIncompatible {
                axis: 0,
                lhs_extent: 1,
                rhs_extent: 2,
            }
        );
    }

    #[test]
    fn assign_rejects_incompatible_shapes() {
        // A single container `rhs` can never make plain `assign` fail: the
        // target shape comes from `rhs` alone, so `lhs` always just adopts
        // it. The only way `assign` can fail is if `rhs` is itself a
        // composite expression whose own children don't broadcast together.
        let mut lhs = Container::<i32>::new(Shape::new(&[2, 5]), Lay::RowMajor).unwrap();
        let a = Container::<i32>::new(Shape::new(&[2, 4]), Lay::RowMajor).unwrap();
        let b = Container::<i32>::new(Shape::new(&[2, 5]), Lay::RowMajor).unwrap();
        let node = crate::expr::node::BinaryNode::<Add, _, _>::new(&a, &b);
        assert!(assign(&mut lhs, &node).is_err());
    }
}

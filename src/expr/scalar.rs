//! Scalar lifting: wraps a single value as a dimension-0
//! expression so `container + 2.0` type-checks without the caller writing
//! `Scalar::new(2.0)` explicitly.

use crate::element::Element;
use crate::error::Error;
use crate::expr::{Expression, IntoExpression};
use crate::shape::{Layout, Shape, Strides};
use crate::stepper::Stepper;

/// A single value broadcast against any shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar<T: Element>(pub T);

impl<T: Element> Scalar<T> {
    pub fn new(value: T) -> Self {
        Scalar(value)
    }
}

/// Stepper over a [`Scalar`]: every axis has stride 0, so stepping never
/// moves and dereferencing always yields the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarStepper<T: Element>(T);

impl<T: Element> Stepper for ScalarStepper<T> {
    type Value = T;
    fn step(&mut self, _axis: usize) {}
    fn step_n(&mut self, _axis: usize, _n: usize) {}
    fn step_back(&mut self, _axis: usize) {}
    fn step_back_n(&mut self, _axis: usize, _n: usize) {}
    fn reset(&mut self, _axis: usize) {}
    fn reset_back(&mut self, _axis: usize) {}
    fn to_begin(&mut self) {}
    fn to_end(&mut self, _layout: Layout) {}
    fn deref(&self) -> T {
        self.0
    }
}

impl<T: Element> Expression for Scalar<T> {
    type Value = T;
    type Stepper<'a>
        = ScalarStepper<T>
    where
        Self: 'a;

    fn dimension(&self) -> usize {
        0
    }

    fn shape(&self) -> Shape {
        Shape::new(&[])
    }

    fn broadcast_shape(&self, _output: &mut Shape) -> Result<bool, Error> {
        // A scalar never constrains the broadcast target: `output` is left
        // untouched and always reports an exact match.
        Ok(true)
    }

    fn is_trivial_broadcast(&self, _strides: &Strides) -> bool {
        true
    }

    fn at(&self, _indices: &[usize]) -> T {
        self.0
    }

    fn stepper_begin(&self, _target_shape: &Shape) -> ScalarStepper<T> {
        ScalarStepper(self.0)
    }
}

macro_rules! impl_into_expression_for_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoExpression for $t {
                type Expr = Scalar<$t>;
                fn into_expression(self) -> Scalar<$t> {
                    Scalar(self)
                }
            }
        )*
    };
}

impl_into_expression_for_scalar!(i32, i64, u32, u64, f32, f64, bool);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_has_dimension_zero() {
        let s = Scalar::new(3.0_f64);
        assert_eq!(s.dimension(), 0);
        assert_eq!(s.shape(), Shape::new(&[]));
    }

    #[test]
    fn scalar_broadcast_never_fails() {
        let s = Scalar::new(1_i32);
        let mut out = Shape::new(&[2, 3, 4]);
        assert_eq!(s.broadcast_shape(&mut out), Ok(true));
        assert_eq!(out, Shape::new(&[2, 3, 4]));
    }

    #[test]
    fn scalar_stepper_always_derefs_to_same_value() {
        let mut stepper = Scalar::new(9_i32).stepper_begin(&Shape::new(&[5]));
        stepper.step(0);
        stepper.step(0);
        assert_eq!(stepper.deref(), 9);
    }
}

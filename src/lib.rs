//! Lazily-evaluated, broadcast-capable, strided n-dimensional arrays.
//!
//! Building `&a + &b` allocates nothing and computes nothing — it builds a
//! small [`expr::node::BinaryNode`] describing the operation. Work happens
//! when that expression is read element-by-element, iterated, or assigned
//! into a [`container::Container`].

pub mod assign;
pub mod container;
pub mod element;
pub mod error;
pub mod expr;
pub mod iter;
pub mod memory;
pub mod ops;
pub mod shape;
pub mod stepper;

pub use container::Container;
pub use element::{Element, FloatElement, IntegerElement, NumericElement, Promote, SignedElement};
pub use error::Error;
pub use expr::scalar::Scalar;
pub use expr::{Expression, IntoExpression};
pub use ops::{
    abs, acos, asin, atan, atan2, build_temporary, ceil, cos, cosh, eq, exp, fdim, floor, fma,
    fmod, ge, gt, hypot, is_finite, is_inf, is_nan, le, log, lt, max, min, ne, pow, remainder,
    round, sin, sinh, tan, tanh, trunc, vectorize,
};
pub use shape::{Backstrides, Layout, Shape, Strides};

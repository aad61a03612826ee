//! Element trait for values stored in a [`crate::container::Container`].
//!
//! Mirrors the role of a GPU-element trait (restricting which primitive
//! types may back a buffer) but for CPU storage: [`Element`] is implemented
//! for every primitive the expression graph can carry through a buffer,
//! including `bool` (the result type of comparison functors). Arithmetic
//! functors additionally bound their inputs with `std::ops` traits directly
//! rather than folding those requirements into `Element` itself, since `bool`
//! has no meaningful `Add`/`Mul`/...
use num_traits::{Float, NumCast};

/// Trait for types that can be stored in a [`crate::container::Container`]
/// and flow through the lazy expression graph.
///
/// Implemented for `i32`, `i64`, `u32`, `u64`, `f32`, `f64` and `bool`. All
/// implementors are `Copy` with a valid all-zero bit pattern, which is what
/// lets [`crate::container::Container::new`] allocate with the `Zeroed`
/// memory policy instead of tracking partial initialization.
pub trait Element: Copy + PartialEq + PartialOrd + 'static + std::fmt::Debug {
    /// Returns `true` if `self` is not a number (always `false` for
    /// non-float element types).
    fn is_nan_elem(self) -> bool;

    /// Returns `true` if `self` is positive or negative infinity (always
    /// `false` for non-float element types).
    fn is_inf_elem(self) -> bool;

    /// Returns `true` if `self` is neither infinite nor NaN (always `true`
    /// for non-float element types).
    fn is_finite_elem(self) -> bool;

    /// The additive identity, used to zero-fill newly reshaped storage and
    /// as the default fill value.
    fn zero_elem() -> Self;
}

macro_rules! impl_element_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Element for $t {
                #[inline]
                fn is_nan_elem(self) -> bool { false }
                #[inline]
                fn is_inf_elem(self) -> bool { false }
                #[inline]
                fn is_finite_elem(self) -> bool { true }
                #[inline]
                fn zero_elem() -> Self { 0 }
            }
        )*
    };
}

macro_rules! impl_element_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl Element for $t {
                #[inline]
                fn is_nan_elem(self) -> bool { Float::is_nan(self) }
                #[inline]
                fn is_inf_elem(self) -> bool { Float::is_infinite(self) }
                #[inline]
                fn is_finite_elem(self) -> bool { Float::is_finite(self) }
                #[inline]
                fn zero_elem() -> Self { 0.0 }
            }
        )*
    };
}

impl_element_int!(i32, i64, u32, u64);
impl_element_float!(f32, f64);

impl Element for bool {
    #[inline]
    fn is_nan_elem(self) -> bool {
        false
    }
    #[inline]
    fn is_inf_elem(self) -> bool {
        false
    }
    #[inline]
    fn is_finite_elem(self) -> bool {
        true
    }
    #[inline]
    fn zero_elem() -> Self {
        false
    }
}

/// Marker for element types representing IEEE-754 floating point.
///
/// Functors whose domain is only meaningful for floats (`exp`, `log`,
/// trigonometric functions, ...) are bounded by this trait rather than
/// [`Element`].
pub trait FloatElement: Element + Float {}
impl FloatElement for f32 {}
impl FloatElement for f64 {}

/// Marker for element types supporting negation (excludes unsigned
/// integers and `bool`).
pub trait SignedElement: Element + std::ops::Neg<Output = Self> {}
impl SignedElement for i32 {}
impl SignedElement for i64 {}
impl SignedElement for f32 {}
impl SignedElement for f64 {}

/// Marker for element types that participate in numeric arithmetic
/// (everything but `bool`).
pub trait NumericElement:
    Element
    + NumCast
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::Rem<Output = Self>
{
}
impl NumericElement for i32 {}
impl NumericElement for i64 {}
impl NumericElement for u32 {}
impl NumericElement for u64 {}
impl NumericElement for f32 {}
impl NumericElement for f64 {}

/// Marker for integer element types, used to bound bitwise functors.
pub trait IntegerElement:
    NumericElement
    + std::ops::BitAnd<Output = Self>
    + std::ops::BitOr<Output = Self>
    + std::ops::BitXor<Output = Self>
{
}
impl IntegerElement for i32 {}
impl IntegerElement for i64 {}
impl IntegerElement for u32 {}
impl IntegerElement for u64 {}

/// Implements the common arithmetic promotion rule: integer widening,
/// then integer/float promotion.
///
/// `Promote<Rhs>::Output` names the value type an arithmetic functor
/// produces when combining `Self` and `Rhs` operands, e.g.
/// `<i32 as Promote<f64>>::Output == f64`.
pub trait Promote<Rhs: NumericElement>: NumericElement {
    /// The promoted result type.
    type Output: NumericElement;

    /// Casts `self` into the promoted output type.
    fn promote_self(self) -> Self::Output;

    /// Casts `rhs` into the promoted output type.
    fn promote_rhs(rhs: Rhs) -> Self::Output;
}

macro_rules! impl_promote_same {
    ($t:ty) => {
        impl Promote<$t> for $t {
            type Output = $t;
            #[inline]
            fn promote_self(self) -> $t {
                self
            }
            #[inline]
            fn promote_rhs(rhs: $t) -> $t {
                rhs
            }
        }
    };
}

macro_rules! impl_promote_pair {
    ($lo:ty, $hi:ty) => {
        impl Promote<$hi> for $lo {
            type Output = $hi;
            #[inline]
            fn promote_self(self) -> $hi {
                NumCast::from(self).expect("promotion cast never overflows a widening target")
            }
            #[inline]
            fn promote_rhs(rhs: $hi) -> $hi {
                rhs
            }
        }
        impl Promote<$lo> for $hi {
            type Output = $hi;
            #[inline]
            fn promote_self(self) -> $hi {
                self
            }
            #[inline]
            fn promote_rhs(rhs: $lo) -> $hi {
                NumCast::from(rhs).expect("promotion cast never overflows a widening target")
            }
        }
    };
}

impl_promote_same!(i32);
impl_promote_same!(i64);
impl_promote_same!(u32);
impl_promote_same!(u64);
impl_promote_same!(f32);
impl_promote_same!(f64);

// integer widening
impl_promote_pair!(i32, i64);
impl_promote_pair!(u32, u64);
impl_promote_pair!(i32, u32);
impl_promote_pair!(i64, u64);

// integer/float promotion
impl_promote_pair!(i32, f32);
impl_promote_pair!(i32, f64);
impl_promote_pair!(i64, f64);
impl_promote_pair!(u32, f32);
impl_promote_pair!(u32, f64);
impl_promote_pair!(u64, f64);
impl_promote_pair!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_promotion_is_identity() {
        assert_eq!(<i32 as Promote<i32>>::promote_self(7), 7);
        assert_eq!(<f64 as Promote<f64>>::promote_rhs(2.5), 2.5);
    }

    #[test]
    fn widening_promotion_picks_wider_type() {
        assert_eq!(<i32 as Promote<f64>>::promote_self(3), 3.0_f64);
        assert_eq!(<i32 as Promote<f64>>::promote_rhs(3.5), 3.5_f64);
    }

    #[test]
    fn float_classification() {
        assert!(f64::NAN.is_nan_elem());
        assert!(f64::INFINITY.is_inf_elem());
        assert!(!f64::INFINITY.is_finite_elem());
        assert!(1.0_f64.is_finite_elem());
    }

    #[test]
    fn integer_classification_is_always_finite() {
        assert!(!5_i32.is_nan_elem());
        assert!(!5_i32.is_inf_elem());
        assert!(5_i32.is_finite_elem());
    }

    #[test]
    fn bool_is_an_element_but_not_numeric() {
        assert!(!bool::zero_elem());
        fn requires_numeric<T: NumericElement>() {}
        requires_numeric::<i32>();
        requires_numeric::<f64>();
    }
}

//! Pure element-wise functors: the operations an expression
//! [`crate::expr::node::Node`] applies to its children's values.

use num_traits::MulAdd;

use crate::element::{Element, FloatElement, IntegerElement, NumericElement, Promote, SignedElement};

/// A pure, argument-free-of-state unary operation.
pub trait UnaryFunctor<A: Element> {
    type Output: Element;
    fn eval(a: A) -> Self::Output;
}

/// A pure binary operation, potentially promoting mismatched operand types.
pub trait BinaryFunctor<A: Element, B: Element> {
    type Output: Element;
    fn eval(a: A, b: B) -> Self::Output;
}

/// A pure ternary operation (`fma` is the only one this crate names).
pub trait TernaryFunctor<A: Element, B: Element, C: Element> {
    type Output: Element;
    fn eval(a: A, b: B, c: C) -> Self::Output;
}

macro_rules! impl_unary_op {
    ($marker:ident, $trait:ident, |$a:ident| $expr:expr) => {
        pub struct $marker;
        impl<A: $trait> UnaryFunctor<A> for $marker {
            type Output = A;
            #[inline]
            fn eval($a: A) -> A {
                $expr
            }
        }
    };
}

macro_rules! impl_unary_predicate {
    ($marker:ident, $trait:ident, |$a:ident| $expr:expr) => {
        pub struct $marker;
        impl<A: $trait> UnaryFunctor<A> for $marker {
            type Output = bool;
            #[inline]
            fn eval($a: A) -> bool {
                $expr
            }
        }
    };
}

impl_unary_op!(Identity, Element, |a| a);
impl_unary_op!(Neg, SignedElement, |a| -a);
impl_unary_op!(Abs, SignedElement, |a| if a < A::zero_elem() { -a } else { a });

impl_unary_op!(Exp, FloatElement, |a| a.exp());
impl_unary_op!(Log, FloatElement, |a| a.ln());
impl_unary_op!(Sin, FloatElement, |a| a.sin());
impl_unary_op!(Cos, FloatElement, |a| a.cos());
impl_unary_op!(Tan, FloatElement, |a| a.tan());
impl_unary_op!(Sinh, FloatElement, |a| a.sinh());
impl_unary_op!(Cosh, FloatElement, |a| a.cosh());
impl_unary_op!(Tanh, FloatElement, |a| a.tanh());
impl_unary_op!(Asin, FloatElement, |a| a.asin());
impl_unary_op!(Acos, FloatElement, |a| a.acos());
impl_unary_op!(Atan, FloatElement, |a| a.atan());
impl_unary_op!(Round, FloatElement, |a| a.round());
impl_unary_op!(Floor, FloatElement, |a| a.floor());
impl_unary_op!(Ceil, FloatElement, |a| a.ceil());
impl_unary_op!(Trunc, FloatElement, |a| a.trunc());

impl_unary_predicate!(IsFinite, Element, |a| a.is_finite_elem());
impl_unary_predicate!(IsInf, Element, |a| a.is_inf_elem());
impl_unary_predicate!(IsNan, Element, |a| a.is_nan_elem());

macro_rules! impl_binary_arith {
    ($marker:ident, |$a:ident, $b:ident| $expr:expr) => {
        pub struct $marker;
        impl<A, B> BinaryFunctor<A, B> for $marker
        where
            A: Promote<B>,
            B: NumericElement,
        {
            type Output = A::Output;
            #[inline]
            fn eval(a: A, b: B) -> A::Output {
                let $a: A::Output = a.promote_self();
                let $b: A::Output = A::promote_rhs(b);
                $expr
            }
        }
    };
}

impl_binary_arith!(Add, |a, b| a + b);
impl_binary_arith!(Sub, |a, b| a - b);
impl_binary_arith!(Mul, |a, b| a * b);
impl_binary_arith!(Div, |a, b| a / b);
impl_binary_arith!(Rem, |a, b| a % b);
impl_binary_arith!(Fmod, |a, b| a % b);
impl_binary_arith!(Min, |a, b| if a < b { a } else { b });
impl_binary_arith!(Max, |a, b| if a > b { a } else { b });
impl_binary_arith!(Fdim, |a, b| if a > b {
    a - b
} else {
    A::Output::zero_elem()
});

macro_rules! impl_binary_float_method {
    ($marker:ident, |$a:ident, $b:ident| $expr:expr) => {
        pub struct $marker;
        impl<A, B> BinaryFunctor<A, B> for $marker
        where
            A: Promote<B>,
            A::Output: FloatElement,
            B: NumericElement,
        {
            type Output = A::Output;
            #[inline]
            fn eval(a: A, b: B) -> A::Output {
                let $a: A::Output = a.promote_self();
                let $b: A::Output = A::promote_rhs(b);
                $expr
            }
        }
    };
}

impl_binary_float_method!(Pow, |a, b| a.powf(b));
impl_binary_float_method!(Hypot, |a, b| a.hypot(b));
impl_binary_float_method!(Atan2, |a, b| a.atan2(b));
impl_binary_float_method!(RemainderIeee, |a, b| a - b * (a / b).round());

macro_rules! impl_binary_bitwise {
    ($marker:ident, |$a:ident, $b:ident| $expr:expr) => {
        pub struct $marker;
        impl<A, B> BinaryFunctor<A, B> for $marker
        where
            A: Promote<B>,
            A::Output: IntegerElement,
            B: NumericElement,
        {
            type Output = A::Output;
            #[inline]
            fn eval(a: A, b: B) -> A::Output {
                let $a: A::Output = a.promote_self();
                let $b: A::Output = A::promote_rhs(b);
                $expr
            }
        }
    };
}

impl_binary_bitwise!(BitAnd, |a, b| a & b);
impl_binary_bitwise!(BitOr, |a, b| a | b);
impl_binary_bitwise!(BitXor, |a, b| a ^ b);

macro_rules! impl_binary_cmp {
    ($marker:ident, |$a:ident, $b:ident| $expr:expr) => {
        pub struct $marker;
        impl<A, B> BinaryFunctor<A, B> for $marker
        where
            A: Promote<B>,
            B: NumericElement,
        {
            type Output = bool;
            #[inline]
            fn eval(a: A, b: B) -> bool {
                let $a: A::Output = a.promote_self();
                let $b: A::Output = A::promote_rhs(b);
                $expr
            }
        }
    };
}

impl_binary_cmp!(Eq, |a, b| a == b);
impl_binary_cmp!(Ne, |a, b| a != b);
impl_binary_cmp!(Lt, |a, b| a < b);
impl_binary_cmp!(Le, |a, b| a <= b);
impl_binary_cmp!(Gt, |a, b| a > b);
impl_binary_cmp!(Ge, |a, b| a >= b);

/// Fused multiply-add: `a * b + c`, each operand independently promoted
/// against a common output type. Floating-point outputs go through
/// `MulAdd::mul_add` (`f32`/`f64`'s hardware fused multiply-add, a single
/// rounding); integer outputs get `num-traits`'s unfused `a*b + c` fallback,
/// matching spec's "fused when available, else two roundings" rule.
pub struct Fma;
impl<A, B, C> TernaryFunctor<A, B, C> for Fma
where
    A: Promote<B>,
    A::Output: Promote<C>,
    B: NumericElement,
    C: NumericElement,
    <A::Output as Promote<C>>::Output: MulAdd<Output = <A::Output as Promote<C>>::Output>,
{
    type Output = <A::Output as Promote<C>>::Output;
    #[inline]
    fn eval(a: A, b: B, c: C) -> Self::Output {
        let ab: A::Output = a.promote_self();
        let bb: A::Output = A::promote_rhs(b);
        let ab: Self::Output = <A::Output as Promote<C>>::promote_self(ab);
        let bb: Self::Output = <A::Output as Promote<C>>::promote_self(bb);
        let cc: Self::Output = <A::Output as Promote<C>>::promote_rhs(c);
        ab.mul_add(bb, cc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_promotes_to_wider_type() {
        assert_eq!(<Add as BinaryFunctor<i32, f64>>::eval(3, 0.5), 3.5);
    }

    #[test]
    fn abs_never_negative() {
        assert_eq!(<Abs as UnaryFunctor<i32>>::eval(-4), 4);
        assert_eq!(<Abs as UnaryFunctor<i32>>::eval(4), 4);
    }

    #[test]
    fn comparison_functor_outputs_bool() {
        assert!(<Lt as BinaryFunctor<i32, i32>>::eval(1, 2));
        assert!(!<Gt as BinaryFunctor<i32, i32>>::eval(1, 2));
    }

    #[test]
    fn fma_computes_product_plus_addend() {
        assert_eq!(<Fma as TernaryFunctor<i32, i32, f64>>::eval(2, 3, 1.5), 7.5);
    }

    #[test]
    fn bitwise_functor_on_integers() {
        assert_eq!(<BitAnd as BinaryFunctor<i32, i32>>::eval(0b110, 0b011), 0b010);
    }
}

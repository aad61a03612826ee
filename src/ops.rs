//! The semantic mixin: operator overloads that build lazy
//! expression nodes instead of computing anything, plus the compound
//! assignment operators and named math functions that have no `std::ops`
//! counterpart.

use crate::assign::{assign, assign_computed};
use crate::container::Container;
use crate::element::{Element, NumericElement, SignedElement};
use crate::error::Error;
use crate::expr::functor::{self, BinaryFunctor, TernaryFunctor, UnaryFunctor};
use crate::expr::node::{BinaryNode, TernaryNode, UnaryNode};
use crate::expr::scalar::Scalar;
use crate::expr::{Expression, IntoExpression};
use crate::shape::Layout;

/// Forces full evaluation of `expr` into a freshly allocated container.
///
/// # Errors
///
/// Propagates [`Error::AllocationFailed`] from the backing allocation.
pub fn build_temporary<T, R>(expr: &R) -> Result<Container<T>, Error>
where
    T: Element,
    R: Expression<Value = T>,
{
    let mut out = Container::<T>::new(expr.shape(), Layout::RowMajor)?;
    assign(&mut out, expr)?;
    Ok(out)
}

impl<T: Element> Container<T> {
    /// Evaluates `expr` into `self`, reshaping as needed.
    pub fn assign<R: Expression<Value = T>>(&mut self, expr: &R) -> Result<(), Error> {
        assign(self, expr)
    }
}

macro_rules! impl_binary_ops {
    ($(($StdTrait:ident, $method:ident, $Functor:ident)),* $(,)?) => {$(
        impl<'a, T, Rhs> std::ops::$StdTrait<Rhs> for &'a Container<T>
        where
            T: Element,
            Rhs: IntoExpression,
            functor::$Functor: BinaryFunctor<T, <Rhs::Expr as Expression>::Value>,
        {
            type Output = BinaryNode<functor::$Functor, &'a Container<T>, Rhs::Expr>;
            fn $method(self, rhs: Rhs) -> Self::Output {
                BinaryNode::new(self, rhs.into_expression())
            }
        }

        impl<T, Rhs> std::ops::$StdTrait<Rhs> for Scalar<T>
        where
            T: Element,
            Rhs: IntoExpression,
            functor::$Functor: BinaryFunctor<T, <Rhs::Expr as Expression>::Value>,
        {
            type Output = BinaryNode<functor::$Functor, Scalar<T>, Rhs::Expr>;
            fn $method(self, rhs: Rhs) -> Self::Output {
                BinaryNode::new(self, rhs.into_expression())
            }
        }

        impl<FL, AL, Rhs> std::ops::$StdTrait<Rhs> for UnaryNode<FL, AL>
        where
            AL: Expression,
            FL: UnaryFunctor<AL::Value>,
            Rhs: IntoExpression,
            functor::$Functor: BinaryFunctor<FL::Output, <Rhs::Expr as Expression>::Value>,
        {
            type Output = BinaryNode<functor::$Functor, UnaryNode<FL, AL>, Rhs::Expr>;
            fn $method(self, rhs: Rhs) -> Self::Output {
                BinaryNode::new(self, rhs.into_expression())
            }
        }

        impl<FL, AL, BL, Rhs> std::ops::$StdTrait<Rhs> for BinaryNode<FL, AL, BL>
        where
            AL: Expression,
            BL: Expression,
            FL: BinaryFunctor<AL::Value, BL::Value>,
            Rhs: IntoExpression,
            functor::$Functor: BinaryFunctor<FL::Output, <Rhs::Expr as Expression>::Value>,
        {
            type Output = BinaryNode<functor::$Functor, BinaryNode<FL, AL, BL>, Rhs::Expr>;
            fn $method(self, rhs: Rhs) -> Self::Output {
                BinaryNode::new(self, rhs.into_expression())
            }
        }

        impl<FL, AL, BL, CL, Rhs> std::ops::$StdTrait<Rhs> for TernaryNode<FL, AL, BL, CL>
        where
            AL: Expression,
            BL: Expression,
            CL: Expression,
            FL: TernaryFunctor<AL::Value, BL::Value, CL::Value>,
            Rhs: IntoExpression,
            functor::$Functor: BinaryFunctor<FL::Output, <Rhs::Expr as Expression>::Value>,
        {
            type Output = BinaryNode<functor::$Functor, TernaryNode<FL, AL, BL, CL>, Rhs::Expr>;
            fn $method(self, rhs: Rhs) -> Self::Output {
                BinaryNode::new(self, rhs.into_expression())
            }
        }
    )*};
}

impl_binary_ops!(
    (Add, add, Add),
    (Sub, sub, Sub),
    (Mul, mul, Mul),
    (Div, div, Div),
    (Rem, rem, Rem),
    (BitAnd, bitand, BitAnd),
    (BitOr, bitor, BitOr),
    (BitXor, bitxor, BitXor),
);

impl<'a, T: Element> std::ops::Neg for &'a Container<T>
where
    T: SignedElement,
{
    type Output = UnaryNode<functor::Neg, &'a Container<T>>;
    fn neg(self) -> Self::Output {
        UnaryNode::new(self)
    }
}

impl<T: Element> std::ops::Neg for Scalar<T>
where
    T: SignedElement,
{
    type Output = UnaryNode<functor::Neg, Scalar<T>>;
    fn neg(self) -> Self::Output {
        UnaryNode::new(self)
    }
}

impl<F, A> std::ops::Neg for UnaryNode<F, A>
where
    A: Expression,
    F: UnaryFunctor<A::Value>,
    F::Output: SignedElement,
{
    type Output = UnaryNode<functor::Neg, UnaryNode<F, A>>;
    fn neg(self) -> Self::Output {
        UnaryNode::new(self)
    }
}

impl<F, A, B> std::ops::Neg for BinaryNode<F, A, B>
where
    A: Expression,
    B: Expression,
    F: BinaryFunctor<A::Value, B::Value>,
    F::Output: SignedElement,
{
    type Output = UnaryNode<functor::Neg, BinaryNode<F, A, B>>;
    fn neg(self) -> Self::Output {
        UnaryNode::new(self)
    }
}

macro_rules! impl_unary_math {
    ($(($name:ident, $Functor:ident)),* $(,)?) => {$(
        #[doc = concat!("Lazily applies the elementwise `", stringify!($name), "` functor.")]
        pub fn $name<E: IntoExpression>(expr: E) -> UnaryNode<functor::$Functor, E::Expr>
        where
            functor::$Functor: UnaryFunctor<<E::Expr as Expression>::Value>,
        {
            UnaryNode::new(expr.into_expression())
        }
    )*};
}

impl_unary_math!(
    (exp, Exp),
    (log, Log),
    (sin, Sin),
    (cos, Cos),
    (tan, Tan),
    (sinh, Sinh),
    (cosh, Cosh),
    (tanh, Tanh),
    (asin, Asin),
    (acos, Acos),
    (atan, Atan),
    (round, Round),
    (floor, Floor),
    (ceil, Ceil),
    (trunc, Trunc),
    (abs, Abs),
    (is_finite, IsFinite),
    (is_inf, IsInf),
    (is_nan, IsNan),
);

macro_rules! impl_binary_math {
    ($(($name:ident, $Functor:ident)),* $(,)?) => {$(
        #[doc = concat!("Lazily applies the elementwise `", stringify!($name), "` functor.")]
        pub fn $name<A: IntoExpression, B: IntoExpression>(
            a: A,
            b: B,
        ) -> BinaryNode<functor::$Functor, A::Expr, B::Expr>
        where
            functor::$Functor: BinaryFunctor<<A::Expr as Expression>::Value, <B::Expr as Expression>::Value>,
        {
            BinaryNode::new(a.into_expression(), b.into_expression())
        }
    )*};
}

impl_binary_math!(
    (pow, Pow),
    (hypot, Hypot),
    (atan2, Atan2),
    (fmod, Fmod),
    (remainder, RemainderIeee),
    (min, Min),
    (max, Max),
    (fdim, Fdim),
    (eq, Eq),
    (ne, Ne),
    (lt, Lt),
    (le, Le),
    (gt, Gt),
    (ge, Ge),
);

/// Fused multiply-add: `a * b + c`, lazily.
pub fn fma<A, B, C>(
    a: A,
    b: B,
    c: C,
) -> TernaryNode<functor::Fma, A::Expr, B::Expr, C::Expr>
where
    A: IntoExpression,
    B: IntoExpression,
    C: IntoExpression,
    functor::Fma: TernaryFunctor<
        <A::Expr as Expression>::Value,
        <B::Expr as Expression>::Value,
        <C::Expr as Expression>::Value,
    >,
{
    TernaryNode::new(a.into_expression(), b.into_expression(), c.into_expression())
}

/// Lifts `f` into the expression graph, applied element-wise.
pub fn vectorize<A, R, Closure>(
    expr: A,
    f: Closure,
) -> crate::expr::node::Vectorize<A::Expr, R, Closure>
where
    A: IntoExpression,
    R: Element,
    Closure: Fn(<A::Expr as Expression>::Value) -> R + Copy,
{
    crate::expr::node::vectorize(expr.into_expression(), f)
}

macro_rules! impl_compound_assign {
    ($(($StdTrait:ident, $method:ident, $Functor:ident)),* $(,)?) => {$(
        impl<T, Rhs> std::ops::$StdTrait<Rhs> for Container<T>
        where
            T: NumericElement,
            Rhs: IntoExpression,
            functor::$Functor: BinaryFunctor<T, <Rhs::Expr as Expression>::Value, Output = T>,
        {
            fn $method(&mut self, rhs: Rhs) {
                let expr = rhs.into_expression();
                assign_computed::<T, Rhs::Expr, functor::$Functor>(self, &expr)
                    .expect("compound assignment shape mismatch");
            }
        }
    )*};
}

impl_compound_assign!(
    (AddAssign, add_assign, Add),
    (SubAssign, sub_assign, Sub),
    (MulAssign, mul_assign, Mul),
    (DivAssign, div_assign, Div),
    (RemAssign, rem_assign, Rem),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Layout as Lay, Shape};

    #[test]
    fn add_two_containers_builds_lazily_then_evaluates() {
        let a = Container::new_filled(Shape::new(&[2]), 1_i32, Lay::RowMajor).unwrap();
        let b = Container::new_filled(Shape::new(&[2]), 2_i32, Lay::RowMajor).unwrap();
        let node = &a + &b;
        let result = build_temporary(&node).unwrap();
        assert!(result.iter().all(|&v| v == 3));
    }

    #[test]
    fn add_with_scalar_literal_rhs() {
        let a = Container::new_filled(Shape::new(&[3]), 2.0_f64, Lay::RowMajor).unwrap();
        let node = &a + 1.5_f64;
        let result = build_temporary(&node).unwrap();
        assert!(result.iter().all(|&v| v == 3.5));
    }

    #[test]
    fn neg_then_add_chains_nodes() {
        let a = Container::new_filled(Shape::new(&[2]), 4_i32, Lay::RowMajor).unwrap();
        let b = Container::new_filled(Shape::new(&[2]), 1_i32, Lay::RowMajor).unwrap();
        let node = (-&a) + &b;
        let result = build_temporary(&node).unwrap();
        assert!(result.iter().all(|&v| v == -3));
    }

    #[test]
    fn add_assign_mutates_in_place() {
        let mut a = Container::new_filled(Shape::new(&[2]), 1_i32, Lay::RowMajor).unwrap();
        let b = Container::new_filled(Shape::new(&[2]), 5_i32, Lay::RowMajor).unwrap();
        a += &b;
        assert!(a.iter().all(|&v| v == 6));
    }

    #[test]
    fn lt_produces_boolean_container() {
        let a = Container::new_filled(Shape::new(&[2]), 1_i32, Lay::RowMajor).unwrap();
        let b = Container::new_filled(Shape::new(&[2]), 5_i32, Lay::RowMajor).unwrap();
        let node = lt(&a, &b);
        let result = build_temporary(&node).unwrap();
        assert!(result.iter().all(|&v| v));
    }

    #[test]
    fn fma_computes_product_plus_addend() {
        let a = Container::new_filled(Shape::new(&[2]), 2_i32, Lay::RowMajor).unwrap();
        let b = Container::new_filled(Shape::new(&[2]), 3_i32, Lay::RowMajor).unwrap();
        let c = Container::new_filled(Shape::new(&[2]), 1_i32, Lay::RowMajor).unwrap();
        let node = fma(&a, &b, &c);
        let result = build_temporary(&node).unwrap();
        assert!(result.iter().all(|&v| v == 7));
    }

    #[test]
    fn container_assign_method_adopts_rhs_shape() {
        // `assign` takes on `rhs`'s own shape unconditionally, even when
        // `lhs` started out with a different (here, larger) one.
        let mut lhs = Container::<i32>::new(Shape::new(&[2, 3]), Lay::RowMajor).unwrap();
        let rhs = Container::new_filled(Shape::new(&[3]), 9_i32, Lay::RowMajor).unwrap();
        lhs.assign(&rhs).unwrap();
        assert_eq!(lhs.shape(), Shape::new(&[3]));
        assert!(lhs.iter().all(|&v| v == 9));
    }

    #[test]
    fn add_with_exp_matches_std_within_one_ulp() {
        let a_vals = [[0.5_f64, 1.5], [2.5, 3.5]];
        let b_vals = [[-0.2_f64, 2.4], [1.3, 4.7]];
        let a = Container::from_shape_with(Shape::new(&[2, 2]), Lay::RowMajor, |idx| {
            a_vals[idx[0]][idx[1]]
        })
        .unwrap();
        let b = Container::from_shape_with(Shape::new(&[2, 2]), Lay::RowMajor, |idx| {
            b_vals[idx[0]][idx[1]]
        })
        .unwrap();
        let node = &a + exp(&b);
        let result = build_temporary(&node).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let expected = a_vals[i][j] + b_vals[i][j].exp();
                approx::assert_relative_eq!(
                    *result.at(&[i, j]).unwrap(),
                    expected,
                    epsilon = f64::EPSILON * 4.0
                );
            }
        }
    }
}

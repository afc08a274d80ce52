//! Declarative macros shared by the kuvert crates.

#[doc(hidden)]
pub use paste::paste;

/// Generate a consuming `with_*` and a borrowing `set_*` variant
/// from a single builder method body.
///
/// The body is written once against `self` and works for both the owned
/// (`with_*`) and the `&mut` (`set_*`) flavour:
///
/// - `fn x(mut self, ..) -> Self` generates `with_x` and `set_x`;
/// - `fn x(mut self, v: Option<T>) -> Self` additionally generates
///   `maybe_with_x`, `maybe_set_x`, `without_x` and `unset_x`;
/// - `fn x(mut self, ..) -> Result<Self, E>` generates `try_with_x` and `try_set_x`.
#[doc(hidden)]
#[macro_export]
macro_rules! __generate_set_and_with {
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $param_name:ident: Option<$param_ty:ty> $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<maybe_with_ $fn_name>](mut $self_token, $param_name: Option<$param_ty>) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<maybe_set_ $fn_name>](&mut $self_token, $param_name: Option<$param_ty>) -> &mut Self {
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $param_name: $param_ty) -> Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $param_name: $param_ty) -> &mut Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<without_ $fn_name>](mut $self_token) -> Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<unset_ $fn_name>](&mut $self_token) -> &mut Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> &mut Self {
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Result<Self, $error:ty> {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            $vis fn [<try_with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Result<Self, $error> {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<try_set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> Result<&mut Self, $error> {
                $($body)*
            }
        }
    };
}

#[doc(inline)]
pub use crate::__generate_set_and_with as generate_set_and_with;

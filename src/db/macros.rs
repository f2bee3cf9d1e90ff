//! Record declaration macro.
//!
//! [`record!`](crate::record) declares a struct and implements
//! [`Record`](crate::db::Record) for it. The expansion is plain field access,
//! so scanning into a declared record costs no reflection at runtime.

/// Declare a struct whose rows can be scanned by column name.
///
/// Field tags follow the type after `=>`: a string renames the column,
/// `"-"` excludes the field. Untagged public fields map under their
/// lower-camel-cased name; private fields are never mapped. Every field that
/// is not tagged `"-"` must implement [`FromValue`](crate::db::FromValue).
///
/// # Example
///
/// ```
/// rowscan::record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct User {
///         pub id: i64,
///         pub user_name: String,            // column "userName"
///         pub email: Option<String> => "mail",
///         pub cached_score: Vec<u32> => "-",
///         revision: u32,                    // private, never mapped
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (@tag) => { ::core::option::Option::None };
    (@tag $tag:tt) => { ::core::option::Option::Some($tag) };

    (@assign $place:expr, $value:ident, $position:ident, "-") => {
        ::core::result::Result::Err($crate::db::FieldError::NoSuchField($position))
    };
    (@assign $place:expr, $value:ident, $position:ident $(, $tag:tt)?) => {
        $crate::db::set_field(&mut $place, $value)
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $(=> $tag:tt)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::db::Record for $name {
            fn fields() -> &'static [$crate::db::FieldDef] {
                const FIELDS: &[$crate::db::FieldDef] = &[
                    $(
                        $crate::db::FieldDef {
                            name: stringify!($field),
                            public: !stringify!($field_vis).is_empty(),
                            tag: $crate::record!(@tag $($tag)?),
                        },
                    )*
                ];
                FIELDS
            }

            fn assign(
                &mut self,
                position: usize,
                value: $crate::db::Value,
            ) -> ::core::result::Result<(), $crate::db::FieldError> {
                #[allow(unused_mut)]
                let mut slot = 0usize;
                $(
                    if position == slot {
                        return $crate::record!(@assign self.$field, value, position $(, $tag)?);
                    }
                    slot += 1;
                )*
                let _ = slot;
                ::core::result::Result::Err($crate::db::FieldError::NoSuchField(position))
            }
        }
    };
}

//! Effect Dependencies

use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;

use super::Ref;

/// One entry of an effect dependency list.
///
/// Entries compare by value, so `0.0` equals `-0.0` and a `NaN` entry never
/// equals anything. Signed and unsigned integers are distinct variants.
/// Pointers compare by address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Dep {
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Ptr(usize),
}

impl Dep {
    /// Identity of a shared allocation.
    pub fn ptr<T: ?Sized>(value: &Arc<T>) -> Self {
        Dep::Ptr(Arc::as_ptr(value) as *const () as usize)
    }
}

impl From<()> for Dep {
    fn from(_: ()) -> Self {
        Dep::Unit
    }
}

impl From<bool> for Dep {
    fn from(value: bool) -> Self {
        Dep::Bool(value)
    }
}

macro_rules! int_dep {
    ($variant:ident as $wide:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for Dep {
                fn from(value: $ty) -> Self {
                    Dep::$variant(value as $wide)
                }
            }
        )*
    };
}

int_dep!(Int as i64: i8, i16, i32, i64, isize);
int_dep!(UInt as u64: u8, u16, u32, u64, usize);

impl From<f64> for Dep {
    fn from(value: f64) -> Self {
        Dep::Float(value)
    }
}

impl From<f32> for Dep {
    fn from(value: f32) -> Self {
        Dep::Float(value.into())
    }
}

impl From<&str> for Dep {
    fn from(value: &str) -> Self {
        Dep::Text(value.to_string())
    }
}

impl From<String> for Dep {
    fn from(value: String) -> Self {
        Dep::Text(value)
    }
}

impl From<&String> for Dep {
    fn from(value: &String) -> Self {
        Dep::Text(value.clone())
    }
}

impl<T> From<&Ref<T>> for Dep {
    fn from(value: &Ref<T>) -> Self {
        value.dep()
    }
}

/// Ordered dependency list of one `use_effect` call.
pub type Dependencies = SmallVec<[Dep; 4]>;

/// Build a [`Dependencies`] list from anything convertible into [`Dep`].
///
/// ```rust
/// use weft_core::{deps, Dep};
///
/// let list = deps![1, "label", true];
/// assert_eq!(list[1], Dep::Text("label".into()));
/// assert!(deps![].is_empty());
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::hooks::Dependencies::new()
    };
    ($($dep:expr),+ $(,)?) => {{
        let mut list = $crate::hooks::Dependencies::new();
        $( list.push($crate::hooks::Dep::from($dep)); )+
        list
    }};
}

/// Whether an effect must run, given the dependencies it last ran with.
///
/// `previous` is `None` when the slot has never run. Inside it, `None` is a
/// snapshot taken without dependencies.
pub(crate) fn should_run(
    previous: Option<&Option<Dependencies>>,
    next: Option<&Dependencies>,
) -> bool {
    match (previous, next) {
        (None, _) | (Some(_), None) => true,
        (Some(_), Some(next)) if next.is_empty() => false,
        (Some(None), Some(_)) => true,
        (Some(Some(previous)), Some(next)) => previous != next,
    }
}

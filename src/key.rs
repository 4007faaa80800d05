use alloc::borrow::Cow;
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Identifies a registration: a type descriptor and an optional name.
///
/// An empty name is the same as no name, so `ServiceKey::named::<T>("")` and `ServiceKey::of::<T>()` are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceKey {
    pub type_info: TypeInfo,
    pub name: Option<Cow<'static, str>>,
}

impl ServiceKey {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(TypeInfo::of::<T>(), Some(name.into()))
    }

    #[inline]
    #[must_use]
    pub fn new(type_info: TypeInfo, name: Option<Cow<'static, str>>) -> Self {
        Self {
            type_info,
            name: name.filter(|name| !name.is_empty()),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({name:?})", self.type_info.name),
            None => f.write_str(self.type_info.name),
        }
    }
}

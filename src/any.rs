use alloc::sync::Arc;
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    mem::size_of,
};

use crate::errors::ResolveErrorKind;

/// Runtime descriptor of a registered or requested type
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit_once("::").map_or(self.name, |(_, name)| name)
    }
}

/// Returns `true` for trait objects: unsized types behind a fat pointer named `dyn ..`.
#[inline]
#[must_use]
pub(crate) fn is_abstract<T: ?Sized + 'static>() -> bool {
    size_of::<*const T>() != size_of::<*const ()>() && type_name::<T>().starts_with("dyn ")
}

/// Type-erased shared instance.
///
/// The erased value is always an `Arc<T>`, so trait objects and sized types are stored the same way
/// and `Arc::ptr_eq` holds between two resolutions of the same cached instance.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

#[inline]
#[must_use]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Instance {
    Arc::new(value)
}

/// Downcasts an erased instance, reporting the mismatch as a resolution error
pub(crate) fn cast<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Result<Arc<T>, ResolveErrorKind> {
    downcast(instance).ok_or_else(|| ResolveErrorKind::IncorrectType {
        expected: TypeInfo::of::<T>(),
        actual: (**instance).type_id(),
    })
}

#[inline]
#[must_use]
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<T>> {
    instance.downcast_ref::<Arc<T>>().cloned()
}

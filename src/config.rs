use alloc::borrow::Cow;

use crate::lifetime::Lifetime;

/// Config for a registration
/// ## Fields
/// - `lifetime`:
///   How the produced instance is reused. Defaults to [`Lifetime::Singleton`].
/// - `name`:
///   Qualifies the registration, so several registrations of one type can coexist.
///   An empty name is the same as no name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub lifetime: Lifetime,
    pub name: Option<Cow<'static, str>>,
}

impl Config {
    #[inline]
    #[must_use]
    pub fn singleton() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn transient() -> Self {
        Self::default().with_lifetime(Lifetime::Transient)
    }

    #[inline]
    #[must_use]
    pub fn scoped() -> Self {
        Self::default().with_lifetime(Lifetime::Scoped)
    }

    #[inline]
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[inline]
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }
}

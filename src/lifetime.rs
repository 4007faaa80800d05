use core::fmt::{self, Display, Formatter};

/// How long a resolved instance is reused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance per container, built eagerly by [`crate::Container::build`]
    #[default]
    Singleton,
    /// A new instance for every resolution, never cached
    Transient,
    /// One instance per [`crate::Scope`]
    Scoped,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
        }
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

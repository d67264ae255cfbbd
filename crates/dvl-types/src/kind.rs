use std::fmt;

/// Stable descriptor naming a record shape.
///
/// Every record type declares its own `EntityKind` (usually its table name).
/// Caches use it as their namespace key, so "hub customer" and "satellite
/// customer" get separate key sets even when they share a key type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKind(&'static str);

impl EntityKind {
    /// Declare a kind. Intended for `const` items on record types.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The kind's name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKind({})", self.0)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

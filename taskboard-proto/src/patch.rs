//! Three-state field for partial updates.
//!
//! A JSON body distinguishes a missing key from an explicit `null`. Fields of
//! type [`Patch<T>`] must carry `#[serde(default)]` so a missing key becomes
//! [`Patch::Absent`]; `null` becomes [`Patch::Clear`] and any other value
//! becomes [`Patch::Set`].

use serde::{Deserialize, Deserializer};

/// One optional field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Key not present: leave the stored value alone.
    #[default]
    Absent,
    /// Explicit `null`: clear the stored value.
    Clear,
    /// New value.
    Set(T),
}

impl<T> Patch<T> {
    /// Returns `true` if the field was not supplied.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Resolves the patch against the current value.
    #[must_use]
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Absent => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Clear, Self::Set))
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU64;
use std::str::FromStr;

/// A dense, positive, store-assigned identifier for entities of kind `T`.
///
/// Unlike a random UUID, these are handed out by the store in increasing
/// order starting at 1, which is what lets `getByPriority`'s "ascending id
/// as a stable tie-breaker" rule (`spec.md` §4.2) mean anything.
pub struct Id<T> {
    value: NonZeroU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Constructs an id from a raw value known to be nonzero, e.g. a
    /// store-assigned counter value or a literal. Panics if `value` is
    /// zero. Untrusted input (CLI arguments, deserialized references to an
    /// id a caller hasn't validated yet) should go through `try_new`
    /// instead.
    pub fn new(value: u64) -> Self {
        Self {
            value: NonZeroU64::new(value).expect("entity ids are 1-based"),
            _marker: PhantomData,
        }
    }

    /// Constructs an id from a raw value that may come from outside the
    /// store (e.g. a CLI argument), returning `Error::Validation` instead
    /// of panicking when it's zero.
    pub fn try_new(value: u64) -> crate::Result<Self> {
        NonZeroU64::new(value)
            .map(|value| Self {
                value,
                _marker: PhantomData,
            })
            .ok_or_else(|| crate::Error::Validation("id must be a positive integer; 0 is not a valid id".into()))
    }

    pub fn get(&self) -> u64 {
        self.value.get()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> FromStr for Id<T> {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .parse()
            .map_err(|_| crate::Error::Validation(format!("invalid id {s:?}: not an integer")))?;
        Self::try_new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.value.get())
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u64::deserialize(deserializer)?;
        NonZeroU64::new(value)
            .map(|v| Id {
                value: v,
                _marker: PhantomData,
            })
            .ok_or_else(|| serde::de::Error::custom("entity id must be nonzero"))
    }
}

/// A monotonic per-kind counter the store uses to hand out dense ids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdSequence<T> {
    next: u64,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for IdSequence<T> {
    fn default() -> Self {
        Self {
            next: 1,
            _marker: PhantomData,
        }
    }
}

impl<T> IdSequence<T> {
    pub fn next_id(&mut self) -> Id<T> {
        let id = Id::new(self.next);
        self.next += 1;
        id
    }

    /// Builds a sequence that will hand out `max + 1` next, used when
    /// rehydrating a sequence from a store that already contains ids up to
    /// `max` (e.g. after loading persisted data from disk).
    pub fn starting_after(max: u64) -> Self {
        Self {
            next: max + 1,
            _marker: PhantomData,
        }
    }
}

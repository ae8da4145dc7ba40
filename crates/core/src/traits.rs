use crate::Result;

/// Common shape shared by every entity the store persists: tasks, buckets,
/// completions. `validate` is called by the store on every insert/update so
/// a malformed entity can never be committed (`spec.md` §3 invariants).
pub trait Entity {
    type Id;

    fn id(&self) -> Self::Id;
    fn validate(&self) -> Result<()>;
}

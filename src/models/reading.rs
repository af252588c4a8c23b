use chrono::NaiveDateTime;

/// One observed point of quota history. Append-only; never mutated after
/// the overwrite-on-refetch upsert settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    /// Bytes of quota left at `timestamp`. Can go negative when the line
    /// is overdrawn.
    pub remaining: i64,
}

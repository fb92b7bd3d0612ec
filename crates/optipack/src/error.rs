use crate::engine::MAX_ITEMS;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `optipack` can produce.
///
/// Catalog validation errors (`EmptyCatalog`, `NonPositiveSize`,
/// `DuplicateSize`) surface from [`PacketCatalog::replace`] so the engine
/// never observes an invalid catalog in normal operation.
/// `UnreachableResidue` indicates a broken internal invariant: the smallest
/// size is itself a catalog member, so residue 0 is always reachable and a
/// covering total always exists. It is reported rather than swallowed.
///
/// [`PacketCatalog::replace`]: crate::PacketCatalog::replace
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested item count is outside `1..=MAX_ITEMS`.
    #[error("items must be between 1 and {MAX_ITEMS}, got {items}")]
    InvalidItems { items: u64 },

    /// The catalog holds no packet sizes; no item count can be covered.
    #[error("catalog must contain at least one packet size")]
    EmptyCatalog,

    /// A packet size of zero was supplied.
    #[error("packet sizes must be positive integers")]
    NonPositiveSize,

    /// The same packet size was supplied more than once.
    #[error("packet sizes must be unique, got {size} more than once")]
    DuplicateSize { size: u64 },

    /// The residue table failed to cover a residue class it must reach.
    #[error("residue class {residue} is unexpectedly unreachable")]
    UnreachableResidue { residue: u64 },
}

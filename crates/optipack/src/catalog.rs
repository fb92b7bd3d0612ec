use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// A packet capacity. Always positive; deduplicated within a catalog.
pub type PacketSize = u64;

/// Catalog the service starts with when none is configured.
pub const DEFAULT_SIZES: [PacketSize; 5] = [250, 500, 1000, 2000, 5000];

/// An immutable view of the catalog at a point in time.
///
/// Sizes are sorted ascending and deduplicated. The version is an opaque,
/// monotonically increasing token; derived structures cached against a
/// snapshot are invalidated by comparing versions, nothing else.
#[derive(Clone, Debug)]
pub struct CatalogSnapshot {
    sizes: Arc<[PacketSize]>,
    version: u64,
}

impl CatalogSnapshot {
    pub(crate) fn new(sizes: Arc<[PacketSize]>, version: u64) -> Self {
        Self { sizes, version }
    }

    /// The packet sizes, ascending.
    pub fn sizes(&self) -> &[PacketSize] {
        &self.sizes
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn smallest(&self) -> Option<PacketSize> {
        self.sizes.first().copied()
    }

    pub fn largest(&self) -> Option<PacketSize> {
        self.sizes.last().copied()
    }
}

/// The set of allowed packet sizes, replaced wholesale and read via
/// snapshots.
///
/// Single-writer/many-reader: [`replace`] swaps the active set atomically,
/// so a reader either sees the old set or the new one, never a mix. Any
/// computation already holding a [`CatalogSnapshot`] is unaffected by a
/// concurrent replace.
///
/// [`replace`]: PacketCatalog::replace
#[derive(Debug)]
pub struct PacketCatalog {
    current: RwLock<CatalogSnapshot>,
}

impl PacketCatalog {
    /// Creates a catalog from the given sizes.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::EmptyCatalog`], [`Error::NonPositiveSize`] or
    /// [`Error::DuplicateSize`] when the input is not a non-empty set of
    /// positive integers.
    pub fn new(sizes: impl IntoIterator<Item = PacketSize>) -> Result<Self> {
        let sizes = normalize(sizes)?;
        Ok(Self {
            current: RwLock::new(CatalogSnapshot::new(sizes, 1)),
        })
    }

    /// Creates a catalog holding [`DEFAULT_SIZES`].
    pub fn with_default_sizes() -> Self {
        Self {
            current: RwLock::new(CatalogSnapshot::new(Arc::from(DEFAULT_SIZES), 1)),
        }
    }

    /// Atomically replaces the active set and bumps the version.
    ///
    /// Validation happens before the swap: on error the current set is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`PacketCatalog::new`].
    pub fn replace(&self, sizes: impl IntoIterator<Item = PacketSize>) -> Result<()> {
        let sizes = normalize(sizes)?;
        let mut current = self.current.write();
        let version = current.version() + 1;
        *current = CatalogSnapshot::new(sizes, version);
        Ok(())
    }

    /// The current set and version. Cheap: clones two words and an `Arc`.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.current.read().clone()
    }
}

impl Default for PacketCatalog {
    fn default() -> Self {
        Self::with_default_sizes()
    }
}

fn normalize(sizes: impl IntoIterator<Item = PacketSize>) -> Result<Arc<[PacketSize]>> {
    let mut sizes: Vec<PacketSize> = sizes.into_iter().collect();
    if sizes.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    if sizes.contains(&0) {
        return Err(Error::NonPositiveSize);
    }
    sizes.sort_unstable();
    if let Some(window) = sizes.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::DuplicateSize { size: window[0] });
    }
    Ok(Arc::from(sizes))
}

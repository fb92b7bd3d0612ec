use crate::residue::ResidueTable;
use crate::{Allocation, CatalogSnapshot, Error, PacketSize, Result};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::Arc;

/// Largest item count a request may carry.
pub const MAX_ITEMS: u64 = 1_000_000_000;

/// Largest modulus a residue table is ever built for. Catalogs whose
/// smallest size exceeds this are served by [`search_totals`] instead (all
/// sizes are then huge, so few packets are ever needed).
const MODULUS_CEILING: u64 = 1 << 21;

/// Largest target the exact min-count DP is allowed to span.
const DP_CEILING: u64 = 1 << 22;

/// Settled-label budget for the bounded best-first searches
/// ([`search_totals`] and [`min_count_constrained`]).
const SEARCH_POP_CEILING: usize = 1 << 22;

/// Tables derived from one catalog version.
///
/// `deficit` is absent when the largest size exceeds [`MODULUS_CEILING`];
/// the count refinement then falls back to the DP or the coverage chain.
struct CachedTables {
    version: u64,
    coverage: ResidueTable,
    deficit: Option<ResidueTable>,
}

/// Computes the optimal packet multiset for a catalog snapshot and an item
/// count: minimal total capacity covering the items, then fewest packets.
///
/// Pure computation over the snapshot; safe to share across any number of
/// worker tasks. The only internal state is a cache of derived residue
/// tables keyed by the snapshot's version token, rebuilt whenever the
/// catalog changes. Cost is bounded by the smallest packet size and the
/// catalog cardinality, never by the item count.
pub struct AllocationEngine {
    cache: Mutex<Option<Arc<CachedTables>>>,
}

impl AllocationEngine {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
        }
    }

    /// Computes the allocation for `items` against `snapshot`.
    ///
    /// The optimum is found in three steps:
    ///
    /// 1. Lexicographic shortest paths modulo the smallest size m give, per
    ///    residue class, the minimal `(total, count)` reaching it.
    /// 2. Every achievable total ≥ items lies in some residue class at or
    ///    above that class's minimum, and every class minimum extends
    ///    upward in m-steps, so scanning the m classes yields the exact
    ///    minimal covering total.
    /// 3. The packet count for that total is minimized separately via the
    ///    deficit table modulo the largest size, because padding the class
    ///    minimum with m-packets can over-count (covering 251 from
    ///    `{250, 500, ...}` must yield one 500, not two 250s).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidItems`] when `items` is outside `1..=MAX_ITEMS`.
    /// - [`Error::EmptyCatalog`] when the snapshot holds no sizes.
    /// - [`Error::UnreachableResidue`] when a residue class the catalog
    ///   guarantees reachable is missing from the table; this is an
    ///   internal invariant violation, never a user error.
    pub fn allocate(&self, snapshot: &CatalogSnapshot, items: u64) -> Result<Allocation> {
        if items == 0 || items > MAX_ITEMS {
            return Err(Error::InvalidItems { items });
        }
        let sizes = snapshot.sizes();
        let Some(&smallest) = sizes.first() else {
            return Err(Error::EmptyCatalog);
        };

        // A single smallest packet covers this and nothing cheaper exists.
        if items <= smallest {
            return Ok(Allocation::new(BTreeMap::from([(smallest, 1)]), items));
        }

        if smallest > MODULUS_CEILING {
            return search_totals(sizes, items, SEARCH_POP_CEILING);
        }

        let tables = self.tables_for(snapshot);
        let target = choose_target_total(&tables.coverage, items)?;
        let packets = compose_exact(&tables, sizes, target);
        Ok(Allocation::new(packets, items))
    }

    fn tables_for(&self, snapshot: &CatalogSnapshot) -> Arc<CachedTables> {
        let mut cache = self.cache.lock();
        if let Some(tables) = cache.as_ref() {
            if tables.version == snapshot.version() {
                return Arc::clone(tables);
            }
        }
        let sizes = snapshot.sizes();
        let tables = Arc::new(CachedTables {
            version: snapshot.version(),
            coverage: ResidueTable::build_coverage(sizes),
            deficit: snapshot
                .largest()
                .filter(|&largest| largest <= MODULUS_CEILING)
                .map(|_| ResidueTable::build_deficit(sizes)),
        });
        *cache = Some(Arc::clone(&tables));
        tables
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// The minimal achievable total ≥ `items`, scanned over all residue
/// classes. Class minima below the items extend upward in modulus steps
/// (each step is one more smallest-size packet), so the candidate for such
/// a class is the unique value in `[items, items + m)` sharing its residue.
fn choose_target_total(coverage: &ResidueTable, items: u64) -> Result<u64> {
    let modulus = coverage.modulus();

    // Zero overshoot is unbeatable.
    if let Some((total, _)) = coverage.best(items % modulus) {
        if total <= items {
            return Ok(items);
        }
    }

    let mut best: Option<u64> = None;
    for residue in 0..modulus {
        let Some((total, _)) = coverage.best(residue) else {
            continue;
        };
        let candidate = if total >= items {
            total
        } else {
            total + (items - total).div_ceil(modulus) * modulus
        };
        best = Some(best.map_or(candidate, |b| b.min(candidate)));
    }

    // Residue 0 is reachable at cost 0 (the empty multiset), so a candidate
    // always exists; anything else is a broken table.
    best.ok_or(Error::UnreachableResidue {
        residue: items % modulus,
    })
}

/// A count-minimal multiset summing exactly to `target`.
///
/// Any such multiset is a walk of non-largest packets reaching
/// `target mod largest` plus filler packets of the largest size, and its
/// count is `(target + walk deficit) / largest`. The cached minimal-deficit
/// walk settles it whenever that walk's own total fits under the target,
/// which is always the case once `target ≥ largest²`. When it does not
/// fit, [`min_count_constrained`] finds the minimal-deficit walk among
/// those that do. The bounded DP and the coverage-chain/greedy fallback
/// only remain for searches that blow their label budget, and the last of
/// these is logged.
fn compose_exact(
    tables: &CachedTables,
    sizes: &[PacketSize],
    target: u64,
) -> BTreeMap<PacketSize, u64> {
    let usable: Vec<PacketSize> = sizes.iter().copied().filter(|&s| s <= target).collect();
    debug_assert!(!usable.is_empty(), "target below every size");

    if let Some(&largest) = usable.last() {
        if largest <= MODULUS_CEILING {
            let owned;
            let deficit = if usable.len() == sizes.len() {
                tables.deficit.as_ref()
            } else {
                owned = ResidueTable::build_deficit(&usable);
                Some(&owned)
            };
            if let Some(deficit) = deficit {
                let residue = target % largest;
                if let Some((_, walk_total)) = deficit.best(residue) {
                    if walk_total <= target {
                        debug_assert_eq!((target - walk_total) % largest, 0);
                        let mut packets = deficit.walk_counts(residue);
                        let fill = (target - walk_total) / largest;
                        if fill > 0 {
                            *packets.entry(largest).or_insert(0) += fill;
                        }
                        return packets;
                    }
                }
            }
        }
    }

    if let Some(packets) = min_count_constrained(&usable, target) {
        return packets;
    }

    if target <= DP_CEILING {
        if let Some(packets) = min_count_exact(&usable, target) {
            return packets;
        }
    }

    tracing::warn!(target, "count refinement fell back to the coverage chain");
    let modulus = tables.coverage.modulus();
    let mut packets = tables.coverage.walk_counts(target % modulus);
    let walk_total: u64 = packets.iter().map(|(size, count)| size * count).sum();
    let fill = (target - walk_total) / modulus;
    if fill > 0 {
        *packets.entry(modulus).or_insert(0) += fill;
    }
    if let Some(greedy) = greedy_exact(&usable, target) {
        if greedy.values().sum::<u64>() < packets.values().sum::<u64>() {
            return greedy;
        }
    }
    packets
}

/// Unbounded min-count DP over exact totals, with predecessors for
/// reconstruction. `sizes` ascending. `None` when `target` is not an exact
/// sum of the sizes.
fn min_count_exact(sizes: &[PacketSize], target: u64) -> Option<BTreeMap<PacketSize, u64>> {
    const UNSET: u32 = u32::MAX;
    let target = target as usize;
    let mut count = vec![UNSET; target + 1];
    let mut pred = vec![0u32; target + 1];
    count[0] = 0;

    for value in 1..=target {
        for (index, &size) in sizes.iter().enumerate() {
            let size = size as usize;
            if size > value {
                break;
            }
            if count[value - size] != UNSET && count[value - size] + 1 < count[value] {
                count[value] = count[value - size] + 1;
                pred[value] = index as u32;
            }
        }
    }

    if count[target] == UNSET {
        return None;
    }
    let mut packets = BTreeMap::new();
    let mut value = target;
    while value > 0 {
        let size = sizes[pred[value] as usize];
        *packets.entry(size).or_insert(0) += 1;
        value -= size as usize;
    }
    Some(packets)
}

/// The minimal-count composition of `target` when the unconstrained
/// minimal-deficit walk overshoots it: a bicriteria search over
/// `(deficit, walk total)` labels, pruning every walk whose total exceeds
/// the target. Labels pop in ascending `(deficit, total)` order, so a
/// popped label is Pareto-useful only when its total beats every earlier
/// label at the same residue, and the first label popped at the target
/// residue is the minimal-deficit walk that fits. `None` when the residue
/// is unreachable within the target or the label budget runs out.
fn min_count_constrained(sizes: &[PacketSize], target: u64) -> Option<BTreeMap<PacketSize, u64>> {
    struct Label {
        residue: u64,
        pred: Option<(usize, PacketSize)>,
    }

    let &largest = sizes.last()?;
    let goal = target % largest;

    let mut labels = vec![Label {
        residue: 0,
        pred: None,
    }];
    let mut best_total: HashMap<u64, u64> = HashMap::new();
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0u64, 0u64, 0usize)));
    let mut settled = 0usize;

    while let Some(Reverse((deficit, total, index))) = heap.pop() {
        let residue = labels[index].residue;
        match best_total.get(&residue) {
            Some(&best) if total >= best => continue, // dominated
            _ => {}
        }
        best_total.insert(residue, total);

        if residue == goal {
            let mut packets = BTreeMap::new();
            let mut at = index;
            while let Some((previous, size)) = labels[at].pred {
                *packets.entry(size).or_insert(0) += 1;
                at = previous;
            }
            debug_assert_eq!((target - total) % largest, 0);
            let fill = (target - total) / largest;
            if fill > 0 {
                *packets.entry(largest).or_insert(0) += fill;
            }
            return Some(packets);
        }

        settled += 1;
        if settled > SEARCH_POP_CEILING {
            return None;
        }

        for &size in sizes {
            if size == largest {
                continue;
            }
            let next_total = total + size;
            if next_total > target {
                continue;
            }
            let next_residue = (residue + size) % largest;
            if best_total
                .get(&next_residue)
                .is_some_and(|&best| next_total >= best)
            {
                continue;
            }
            labels.push(Label {
                residue: next_residue,
                pred: Some((index, size)),
            });
            heap.push(Reverse((
                deficit + (largest - size),
                next_total,
                labels.len() - 1,
            )));
        }
    }

    None
}

/// Greedy large-to-small composition; `Some` only when it lands exactly on
/// the target.
fn greedy_exact(sizes: &[PacketSize], target: u64) -> Option<BTreeMap<PacketSize, u64>> {
    let mut packets = BTreeMap::new();
    let mut remaining = target;
    for &size in sizes.iter().rev() {
        let count = remaining / size;
        if count > 0 {
            packets.insert(size, count);
            remaining %= size;
        }
    }
    (remaining == 0).then_some(packets)
}

/// Best-first search over exact totals, for catalogs whose smallest size
/// exceeds the residue-table ceiling. Totals are settled in lexicographic
/// `(total, count)` order, so the first settled total covering the items
/// is the optimum. Settling below the items is budgeted: past
/// `pop_budget`, each further sub-target total is extended straight to a
/// covering candidate (one run of a single size) instead of step by step,
/// so the search still terminates on a valid cover built from the
/// discovered frontier. Only minimality can degrade past the budget, and
/// tripping it is logged.
fn search_totals(sizes: &[PacketSize], items: u64, pop_budget: usize) -> Result<Allocation> {
    let mut best: HashMap<u64, (u64, Option<(u64, PacketSize, u64)>)> = HashMap::new();
    let mut heap = BinaryHeap::new();
    best.insert(0, (0, None));
    heap.push(Reverse((0u64, 0u64)));
    let mut settled = 0usize;
    let mut exhausted = false;

    while let Some(Reverse((total, count))) = heap.pop() {
        match best.get(&total) {
            Some(&(current, _)) if current == count => {}
            _ => continue, // stale heap entry
        }
        if total >= items {
            let mut packets = BTreeMap::new();
            let mut at = total;
            while at != 0 {
                let Some(&(_, Some((previous, size, run)))) = best.get(&at) else {
                    return Err(Error::UnreachableResidue { residue: at });
                };
                *packets.entry(size).or_insert(0) += run;
                at = previous;
            }
            return Ok(Allocation::new(packets, items));
        }

        settled += 1;
        if settled > pop_budget && !exhausted {
            exhausted = true;
            tracing::warn!(
                items,
                "total search budget exhausted; completing covers from the discovered frontier"
            );
        }

        for &size in sizes {
            let run = if exhausted {
                (items - total).div_ceil(size)
            } else {
                1
            };
            let Some(next) = size
                .checked_mul(run)
                .and_then(|step| total.checked_add(step))
            else {
                continue;
            };
            let candidate = count + run;
            if best.get(&next).is_none_or(|&(current, _)| candidate < current) {
                best.insert(next, (candidate, Some((total, size, run))));
                heap.push(Reverse((next, candidate)));
            }
        }
    }

    // Only reachable when every extension of every discovered total
    // overflows u64; a run of the smallest size is then the cover.
    let smallest = sizes[0];
    Ok(Allocation::new(
        BTreeMap::from([(smallest, items.div_ceil(smallest))]),
        items,
    ))
}

use crate::PacketSize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// One settled residue class: the lexicographically minimal accumulated
/// weight pair and the edge that reached it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ResidueNode {
    pub primary: u64,
    pub secondary: u64,
    /// `(previous residue, packet size walked)`; `None` only at residue 0.
    pub pred: Option<(u32, PacketSize)>,
}

/// Shortest paths over residue classes, built once per catalog version.
///
/// Two flavors share the structure:
///
/// - *coverage* (modulo the smallest size m): `primary` is the minimal total
///   capacity whose value mod m equals the residue, `secondary` the fewest
///   packets achieving that exact total. A complete, N-independent
///   description of the cheapest way to reach any residue class.
/// - *deficit* (modulo the largest size L): walks of non-L packets, where
///   `primary` accumulates `L - s` per step and `secondary` the walk's
///   total. Any multiset summing exactly to `T` is such a walk plus filler
///   L-packets and uses `(T + deficit) / L` packets, so the minimal-deficit
///   walk yields the minimal packet count for `T` whenever its total fits.
#[derive(Debug)]
pub(crate) struct ResidueTable {
    modulus: u64,
    nodes: Vec<Option<ResidueNode>>,
}

impl ResidueTable {
    /// Builds the coverage table modulo the smallest size.
    ///
    /// `sizes` must be non-empty, ascending and deduplicated.
    pub fn build_coverage(sizes: &[PacketSize]) -> Self {
        let modulus = sizes.first().copied().unwrap_or(1);
        Self {
            modulus,
            nodes: lexicographic_shortest(modulus, sizes, |s| Some((s, 1))),
        }
    }

    /// Builds the deficit table modulo the largest size. The largest size
    /// itself contributes no edges; it is the filler.
    pub fn build_deficit(sizes: &[PacketSize]) -> Self {
        let modulus = sizes.last().copied().unwrap_or(1);
        Self {
            modulus,
            nodes: lexicographic_shortest(modulus, sizes, |s| {
                (s != modulus).then(|| (modulus - s, s))
            }),
        }
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// The minimal `(primary, secondary)` pair for a residue class, or
    /// `None` when no combination of sizes reaches it.
    pub fn best(&self, residue: u64) -> Option<(u64, u64)> {
        self.nodes[residue as usize].map(|n| (n.primary, n.secondary))
    }

    /// Packet counts along the predecessor chain from `residue` back to 0.
    pub fn walk_counts(&self, residue: u64) -> BTreeMap<PacketSize, u64> {
        let mut counts = BTreeMap::new();
        let mut at = residue as usize;
        while let Some(node) = &self.nodes[at] {
            let Some((prev, size)) = node.pred else { break };
            *counts.entry(size).or_insert(0) += 1;
            at = prev as usize;
        }
        counts
    }
}

/// Dijkstra from residue 0 with a combined lexicographic key, so the
/// secondary weight tie-break can never drift from the primary one.
///
/// `weight` maps a packet size to its `(primary, secondary)` edge weight,
/// or `None` to leave the size out of the graph. Primary weights are
/// strictly positive for every edge both flavors generate, which keeps the
/// search free of zero-weight cycles.
fn lexicographic_shortest(
    modulus: u64,
    sizes: &[PacketSize],
    weight: impl Fn(PacketSize) -> Option<(u64, u64)>,
) -> Vec<Option<ResidueNode>> {
    let mut nodes: Vec<Option<ResidueNode>> = vec![None; modulus as usize];
    nodes[0] = Some(ResidueNode {
        primary: 0,
        secondary: 0,
        pred: None,
    });

    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0u64, 0u64, 0u32)));

    while let Some(Reverse((primary, secondary, at))) = heap.pop() {
        match nodes[at as usize] {
            Some(node) if (node.primary, node.secondary) == (primary, secondary) => {}
            _ => continue, // stale heap entry
        }
        for &size in sizes {
            let Some((wp, ws)) = weight(size) else { continue };
            let next = ((u64::from(at) + size % modulus) % modulus) as u32;
            let candidate = (primary.saturating_add(wp), secondary.saturating_add(ws));
            if candidate.0 == u64::MAX {
                continue; // overflowed; nothing this large can win
            }
            let better = match nodes[next as usize] {
                None => true,
                Some(n) => candidate < (n.primary, n.secondary),
            };
            if better {
                nodes[next as usize] = Some(ResidueNode {
                    primary: candidate.0,
                    secondary: candidate.1,
                    pred: Some((at, size)),
                });
                heap.push(Reverse((candidate.0, candidate.1, next)));
            }
        }
    }

    nodes
}

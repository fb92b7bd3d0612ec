use crate::PacketSize;
use std::collections::BTreeMap;

/// The packet multiset covering a requested item count.
///
/// Entries with a zero count are omitted. Invariants upheld by the engine:
/// `total_capacity >= items`, no other multiset drawable from the same
/// catalog covers the items with a smaller total capacity, and among equal
/// totals none uses fewer packets.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Allocation {
    packets: BTreeMap<PacketSize, u64>,
    total_capacity: u64,
    packet_count: u64,
    overshoot: u64,
}

impl Allocation {
    pub(crate) fn new(packets: BTreeMap<PacketSize, u64>, items: u64) -> Self {
        debug_assert!(packets.values().all(|&count| count > 0));
        let total_capacity = packets
            .iter()
            .fold(0u64, |acc, (size, count)| acc + size * count);
        let packet_count = packets.values().sum();
        debug_assert!(total_capacity >= items);
        Self {
            packets,
            total_capacity,
            packet_count,
            overshoot: total_capacity - items,
        }
    }

    /// Packet size to count, ascending by size.
    pub fn packets(&self) -> &BTreeMap<PacketSize, u64> {
        &self.packets
    }

    /// Sum of `size * count` over all entries.
    pub fn total_capacity(&self) -> u64 {
        self.total_capacity
    }

    /// Total number of packets shipped.
    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    /// Capacity shipped beyond the requested items (waste).
    pub fn overshoot(&self) -> u64 {
        self.overshoot
    }

    pub fn covers(&self, items: u64) -> bool {
        self.total_capacity >= items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packets(entries: &[(PacketSize, u64)]) -> BTreeMap<PacketSize, u64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn derived_fields_follow_the_map() {
        let allocation = Allocation::new(packets(&[(250, 1), (2000, 1), (5000, 2)]), 12_001);
        assert_eq!(allocation.total_capacity(), 12_250);
        assert_eq!(allocation.packet_count(), 4);
        assert_eq!(allocation.overshoot(), 249);
        assert!(allocation.covers(12_001));
        assert!(!allocation.covers(12_251));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_sizes_as_object_keys() {
        let allocation = Allocation::new(packets(&[(250, 1), (500, 2)]), 1_200);
        let json = serde_json::to_value(&allocation).unwrap();
        assert_eq!(json["packets"]["250"], 1);
        assert_eq!(json["packets"]["500"], 2);
        assert_eq!(json["total_capacity"], 1_250);
        assert_eq!(json["packet_count"], 3);
        assert_eq!(json["overshoot"], 50);
    }
}

//! Codec fuzzing (S6): random payloads round-trip, truncated ones fail
//! with `InvalidLength`.

use proptest::prelude::*;

use ripd::config::NeighborConfig;
use ripd::error::PacketError;
use ripd::packet::{Packet, HEADER_LEN};
use ripd::route::RoutingTable;

fn neighbor(neighbor_id: u16) -> NeighborConfig {
    NeighborConfig {
        output_port: 20000,
        metric: 1,
        neighbor_id,
    }
}

proptest! {
    #[test]
    fn random_tables_round_trip_through_the_wire(
        destinations in prop::collection::vec(1u16..=64000, 0..20),
    ) {
        let mut table = RoutingTable::new(999);
        let now = std::time::Instant::now();
        for (i, dest) in destinations.iter().enumerate() {
            if *dest == 999 {
                continue;
            }
            let metric = ((i % 15) + 1) as u8;
            table.upsert(*dest, metric, 2, now);
        }

        let payload = ripd::packet::encode_response(1, &table, 7);
        let decoded = Packet::decode(&payload).expect("encoder output must decode");
        let advertisement = decoded
            .validate(&[neighbor(2)])
            .expect("encoder output must validate");

        let expected: Vec<(u16, u8)> = table
            .snapshot()
            .map(|entry| {
                let metric = if entry.next_hop == 7 { 16 } else { entry.metric };
                (entry.destination, metric)
            })
            .collect();
        let mut actual = advertisement.entries.clone();
        actual.sort();
        let mut expected = expected;
        expected.sort();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn truncated_payloads_always_fail_with_invalid_length(
        extra_bytes in 1usize..20,
        entry_count in 0usize..5,
    ) {
        let len = HEADER_LEN + entry_count * 20 + extra_bytes;
        // Skip lengths that accidentally land back on a valid boundary.
        prop_assume!((len.saturating_sub(HEADER_LEN)) % 20 != 0 || len < HEADER_LEN);
        let buf = vec![0u8; len];
        prop_assert_eq!(Packet::decode(&buf).unwrap_err(), PacketError::InvalidLength);
    }
}

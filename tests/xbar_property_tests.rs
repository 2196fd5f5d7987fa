use proptest::prelude::*;
use std::collections::VecDeque;

use xbar_tb::config::{AddressMap, INITIAL_PATTERN};
use xbar_tb::model::BehavioralXbar;
use xbar_tb::report::{CollectingSink, Outcome};
use xbar_tb::shadow::merge_byte_lanes;
use xbar_tb::{apply_request_sequence, PortId, Request, RequestSequence, Testbench};

type Tb = Testbench<BehavioralXbar, CollectingSink>;

fn create_testbench() -> Tb {
    Testbench::with_sink(BehavioralXbar::new().with_trace(), CollectingSink::default())
}

/// Iteration budget that comfortably covers full contention on one peripheral.
fn generous_limit(sequences: &[RequestSequence; 3], delays: [u32; 4]) -> u32 {
    let longest = sequences.iter().map(VecDeque::len).max().unwrap_or(0) as u32;
    let max_delay = delays.iter().copied().max().unwrap_or(0);
    longest * (max_delay + 2) * 4 + 20
}

// Property test generators

/// Generate a word address anywhere on the 16-bit bus
fn word_addr() -> impl Strategy<Value = u32> {
    any::<u16>().prop_map(u32::from)
}

fn read_slot() -> impl Strategy<Value = Option<Request>> {
    prop_oneof![
        1 => Just(None::<Request>),
        1 => word_addr().prop_map(|addr| Some(Request::read(addr))),
    ]
}

fn any_slot() -> impl Strategy<Value = Option<Request>> {
    prop_oneof![
        2 => Just(None::<Request>),
        2 => word_addr().prop_map(|addr| Some(Request::read(addr))),
        1 => (word_addr(), 0u8..16, any::<u32>())
            .prop_map(|(addr, be, data)| Some(Request::write(addr, be, data))),
    ]
}

fn sequences() -> impl Strategy<Value = [RequestSequence; 3]> {
    (
        prop::collection::vec_deque(read_slot(), 0..30),
        prop::collection::vec_deque(any_slot(), 0..30),
        prop::collection::vec_deque(any_slot(), 0..30),
    )
        .prop_map(|(a, b, c)| [a, b, c])
}

fn delays() -> impl Strategy<Value = [u32; 4]> {
    prop::array::uniform4(0u32..3)
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: ready never rises while request is low, and the run drains
        #[test]
        fn prop_idle_ready_and_termination(seqs in sequences(), delays in delays()) {
            let mut tb = create_testbench();
            let limit = generous_limit(&seqs, delays);
            let report = apply_request_sequence(&mut tb, delays, limit, seqs).unwrap();

            prop_assert_eq!(report.outcome, Outcome::Done);
            prop_assert!(report.passed(), "failures: {:?}", report.failures);
            for sample in tb.dut().trace() {
                for port in 0..3 {
                    prop_assert!(sample.req[port] || !sample.ready[port]);
                }
            }
        }

        /// Property: every issued request completes before the port issues the next one
        #[test]
        fn prop_at_most_one_request_in_flight(seqs in sequences(), delays in delays()) {
            let issued: Vec<usize> = seqs.iter().map(|s| s.iter().flatten().count()).collect();
            let mut tb = create_testbench();
            let limit = generous_limit(&seqs, delays);
            let report = apply_request_sequence(&mut tb, delays, limit, seqs).unwrap();
            prop_assert_eq!(report.outcome, Outcome::Done);

            for id in PortId::all() {
                let port = id.to_string();
                let events: Vec<bool> = tb
                    .sink()
                    .records
                    .iter()
                    .filter(|r| r.get("port") == Some(port.as_str()))
                    .filter_map(|r| match r.message.as_str() {
                        "Request issued" => Some(true),
                        "Read completed" | "Write completed" => Some(false),
                        _ => None,
                    })
                    .collect();

                prop_assert_eq!(events.len(), 2 * issued[id.index()]);
                for (i, issue) in events.iter().enumerate() {
                    prop_assert_eq!(*issue, i % 2 == 0);
                }
            }
        }

        /// Property: a read after a write returns the old word with the enabled lanes replaced
        #[test]
        fn prop_write_then_read(
            addr in word_addr(),
            be in 0u8..16,
            data in any::<u32>(),
            writer in 2u32..=3,
            reader in 1u32..=3,
            delays in delays(),
        ) {
            let mut seqs: [RequestSequence; 3] = Default::default();
            seqs[(writer - 1) as usize].push_back(Some(Request::write(addr, be, data)));
            // The reader waits until the write has surely retired.
            for _ in 0..8 {
                seqs[(reader - 1) as usize].push_back(None);
            }
            seqs[(reader - 1) as usize].push_back(Some(Request::read(addr)));

            let mut tb = create_testbench();
            let report = apply_request_sequence(&mut tb, delays, 200, seqs).unwrap();
            prop_assert!(report.passed(), "failures: {:?}", report.failures);

            let expected = merge_byte_lanes(INITIAL_PATTERN[(addr % 4) as usize], data, be);
            let reads: Vec<u32> = report.reads().map(|(_, _, value)| value).collect();
            prop_assert_eq!(reads, vec![expected]);
        }

        /// Property: addresses four words apart inside a peripheral share a location
        #[test]
        fn prop_offsets_wrap(
            addr in word_addr(),
            stride in 1u32..0x1000,
            data in any::<u32>(),
        ) {
            let map = AddressMap::default();
            let peripheral = map.peripheral_of(addr);
            let alias = map.base_of(peripheral) | ((addr + 4 * stride) & 0x3FFF);
            prop_assume!(map.peripheral_of(alias) == peripheral);

            let mut seqs: [RequestSequence; 3] = Default::default();
            seqs[1].push_back(Some(Request::write(addr, 0xF, data)));
            seqs[1].push_back(Some(Request::read(alias)));

            let mut tb = create_testbench();
            let report = apply_request_sequence(&mut tb, [0; 4], 50, seqs).unwrap();
            prop_assert!(report.passed());
            prop_assert_eq!(report.reads().map(|(_, _, v)| v).collect::<Vec<_>>(), vec![data]);
            prop_assert_eq!(tb.dut().memory_word(peripheral, (alias % 4) as usize), data);
        }
    }
}

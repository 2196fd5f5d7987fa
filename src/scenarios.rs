//! Request tables for the crossbar tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AddressMap, CONTROLLER_PORTS, PERIPHERAL_COUNT};
use crate::engine::apply_request_sequence;
use crate::error::{TbError, TbResult};
use crate::port::{PortId, XbarDut};
use crate::report::{LogSink, RunSummary};
use crate::request::{idle_sequence, Request, RequestSequence};
use crate::testbench::Testbench;

pub const SCENARIO_NAMES: [&str; 5] = [
    "simple_read",
    "simple_write",
    "partial_write",
    "concurrent_read",
    "variable_delay_fuzz",
];

/// One invocation of the request engine.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub delays: [u32; PERIPHERAL_COUNT],
    pub iteration_limit: u32,
    pub sequences: [RequestSequence; CONTROLLER_PORTS],
}

/// Builds a scenario from idle-padded per-port sequences.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scenario: Scenario {
                name: name.into(),
                delays: [0; PERIPHERAL_COUNT],
                iteration_limit: 100,
                sequences: Default::default(),
            },
        }
    }

    pub fn delays(mut self, delays: [u32; PERIPHERAL_COUNT]) -> Self {
        self.scenario.delays = delays;
        self
    }

    pub fn iteration_limit(mut self, limit: u32) -> Self {
        self.scenario.iteration_limit = limit;
        self
    }

    /// Pads the given ports with `len` idle slots.
    pub fn idle(mut self, ports: &[u32], len: usize) -> TbResult<Self> {
        for &n in ports {
            let id = PortId::new(n)?;
            self.scenario.sequences[id.index()].extend(idle_sequence(len));
        }
        Ok(self)
    }

    /// Replaces slot `slot` of port `port` with `request`.
    pub fn set(mut self, port: u32, slot: usize, request: Request) -> TbResult<Self> {
        let id = PortId::new(port)?;
        let sequence = &mut self.scenario.sequences[id.index()];
        let len = sequence.len();
        let entry = sequence
            .get_mut(slot)
            .ok_or(TbError::SlotOutOfRange { port, slot, len })?;
        *entry = Some(request);
        Ok(self)
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}

/// One read per port at staggered slots, each to a different peripheral.
pub fn simple_read(map: AddressMap) -> TbResult<Scenario> {
    Ok(ScenarioBuilder::new("simple_read")
        .delays([1, 2, 3, 4])
        .iteration_limit(100)
        .idle(&[1, 2, 3], 50)?
        .set(1, 10, Request::read(map.base_of(0)))?
        .set(2, 20, Request::read(map.base_of(1)))?
        .set(3, 30, Request::read(map.base_of(2)))?
        .build())
}

/// Full-word write immediately followed by a read of the same word.
pub fn simple_write(map: AddressMap) -> TbResult<Scenario> {
    let addr = map.base_of(1);
    Ok(ScenarioBuilder::new("simple_write")
        .iteration_limit(50)
        .idle(&[2, 3], 30)?
        .set(2, 10, Request::write(addr, 0xF, 0xABAB_ABAB))?
        .set(2, 11, Request::read(addr))?
        .build())
}

/// Low two byte lanes written over `0x1234ABCD`, then read back.
pub fn partial_write(map: AddressMap) -> TbResult<Scenario> {
    let addr = map.base_of(3) + 2;
    Ok(ScenarioBuilder::new("partial_write")
        .iteration_limit(50)
        .idle(&[2, 3], 30)?
        .set(3, 20, Request::write(addr, 0x3, 0xABAB_ABAB))?
        .set(3, 21, Request::read(addr))?
        .build())
}

/// All ports read the same word in the first slot, for delays 0, 1 and 2.
pub fn concurrent_read(map: AddressMap) -> TbResult<Vec<Scenario>> {
    (0..3)
        .map(|delay| -> TbResult<Scenario> {
            let mut builder = ScenarioBuilder::new(format!("concurrent_read/delay={delay}"))
                .delays([delay; PERIPHERAL_COUNT])
                .iteration_limit(50)
                .idle(&[1, 2, 3], 10)?;
            for port in 1..=CONTROLLER_PORTS as u32 {
                builder = builder.set(port, 0, Request::read(map.base_of(1)))?;
            }
            Ok(builder.build())
        })
        .collect()
}

/// Random requests per port, identical for every combination of peripheral
/// delays in `0..3`. Port 1 only reads; the others may write to the upper
/// two peripherals.
pub fn variable_delay_fuzz(map: AddressMap, seed: u64, request_count: usize) -> Vec<Scenario> {
    let mut scenarios = Vec::with_capacity(81);
    for p1 in 0..3 {
        for p2 in 0..3 {
            for p3 in 0..3 {
                for p4 in 0..3 {
                    let delays = [p1, p2, p3, p4];
                    let max_delay = delays.iter().sum::<u32>() + 2;
                    let limit = (max_delay as usize * request_count * 120 / 100) as u32;

                    scenarios.push(Scenario {
                        name: format!("variable_delay_fuzz/{p1}/{p2}/{p3}/{p4}"),
                        delays,
                        iteration_limit: limit,
                        sequences: random_sequences(map, seed, request_count),
                    });
                }
            }
        }
    }
    scenarios
}

fn random_sequences(
    map: AddressMap,
    seed: u64,
    request_count: usize,
) -> [RequestSequence; CONTROLLER_PORTS] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sequences: [RequestSequence; CONTROLLER_PORTS] = Default::default();

    for _ in 0..request_count {
        for (port, sequence) in sequences.iter_mut().enumerate() {
            if !rng.gen::<bool>() {
                sequence.push_back(None);
                continue;
            }

            let addr = map.mask(rng.gen());
            let writable_target = map.peripheral_of(addr) >= 2;
            let request = if port != 0 && writable_target && rng.gen::<bool>() {
                Request::write(addr, rng.gen_range(0..0x10), rng.gen())
            } else {
                Request::read(addr)
            };
            sequence.push_back(Some(request));
        }
    }
    sequences
}

/// Every scenario, in the order the binary runs them.
pub fn all(map: AddressMap, seed: u64, fuzz_requests: usize) -> TbResult<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    for name in SCENARIO_NAMES {
        scenarios.extend(by_name(name, map, seed, fuzz_requests)?);
    }
    Ok(scenarios)
}

pub fn by_name(
    name: &str,
    map: AddressMap,
    seed: u64,
    fuzz_requests: usize,
) -> TbResult<Vec<Scenario>> {
    match name {
        "simple_read" => Ok(vec![simple_read(map)?]),
        "simple_write" => Ok(vec![simple_write(map)?]),
        "partial_write" => Ok(vec![partial_write(map)?]),
        "concurrent_read" => concurrent_read(map),
        "variable_delay_fuzz" => Ok(variable_delay_fuzz(map, seed, fuzz_requests)),
        other => Err(TbError::UnknownScenario(other.to_string())),
    }
}

/// Runs scenarios strictly one after another on the same testbench.
pub fn run_scenarios<D: XbarDut, S: LogSink>(
    tb: &mut Testbench<D, S>,
    scenarios: Vec<Scenario>,
) -> TbResult<RunSummary> {
    let mut summary = RunSummary::default();
    for scenario in scenarios {
        tb.info(format!("{}...", scenario.name));
        tb.debug(format!("delays {:?}", scenario.delays));
        let mut report = apply_request_sequence(
            tb,
            scenario.delays,
            scenario.iteration_limit,
            scenario.sequences,
        )?;
        report.name = scenario.name;
        tb.info(format!(
            "Done after {} iterations, {} errors.",
            report.iterations,
            report.error_count()
        ));
        summary.push(report);
    }
    Ok(summary)
}

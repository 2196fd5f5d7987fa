//! Drives per-port request sequences through the crossbar and checks every
//! completed transaction against a shadow copy of the memories.

use crate::config::{AddressMap, CONTROLLER_PORTS, PERIPHERAL_COUNT};
use crate::error::TbResult;
use crate::port::{PortId, XbarDut};
use crate::report::{
    Access, Completion, Failure, FailureKind, LogRecord, LogSink, Outcome, ScenarioReport,
    Severity,
};
use crate::request::RequestSequence;
use crate::shadow::ShadowMemory;
use crate::testbench::Testbench;

#[derive(Debug, Clone, Copy, Default)]
struct PortState {
    /// Request asserted and not yet acknowledged.
    active: bool,
    /// Sequence drained.
    finished: bool,
}

struct Engine<'tb, D: XbarDut, S: LogSink> {
    tb: &'tb mut Testbench<D, S>,
    ports: [PortState; CONTROLLER_PORTS],
    shadow: ShadowMemory,
    iteration: u32,
    failures: Vec<Failure>,
    completions: Vec<Completion>,
}

impl<'tb, D: XbarDut, S: LogSink> Engine<'tb, D, S> {
    fn fail(&mut self, kind: FailureKind, port: Option<PortId>, record: LogRecord) {
        self.failures.push(Failure {
            kind,
            time: self.tb.time(),
            iteration: self.iteration,
            port,
        });
        self.tb.emit(record.field("iteration", self.iteration));
    }

    /// Issues the next slot on every port that is free to take one.
    fn feed(&mut self, sequences: &mut [RequestSequence; CONTROLLER_PORTS]) {
        for id in PortId::all() {
            let state = &mut self.ports[id.index()];
            if state.active {
                continue;
            }

            let sequence = &mut sequences[id.index()];
            let Some(slot) = sequence.pop_front() else {
                // The last request was acknowledged with req still raised.
                state.finished = true;
                self.tb.port_view(id).set_req(false);
                continue;
            };

            let mut port = self.tb.port_view(id);
            match slot {
                Some(request) => {
                    port.set_req(true);
                    port.set_addr(request.addr);
                    if port.is_writable() {
                        if request.is_write {
                            port.drive_write(request.be, request.wdata);
                        } else {
                            port.set_wen(false);
                        }
                    }
                    self.ports[id.index()].active = true;

                    let record = LogRecord::new(Severity::Debug, self.tb.time(), "Request issued")
                        .field("port", id)
                        .field("addr", format!("{:#x}", request.addr))
                        .field("write", request.is_write);
                    self.tb.emit(record);
                }
                None => {
                    port.set_req(false);
                    self.ports[id.index()].active = false;
                }
            }
        }
    }

    /// Ready must stay low while request is low.
    fn check_idle_ready(&mut self) {
        for id in PortId::all() {
            let port = self.tb.port_view(id);
            if !port.req() && port.ready() {
                let record = LogRecord::new(
                    Severity::AssertFailure,
                    self.tb.time(),
                    format!("Port {id}: Ready asserted although no request is present!"),
                )
                .field("port", id);
                self.fail(FailureKind::ProtocolViolation, Some(id), record);
            }
        }
    }

    /// Retires handshakes, updating the shadow on writes and checking reads.
    fn collect_responses(&mut self) {
        for id in PortId::all() {
            let port = self.tb.port_view(id);
            if !(port.req() && port.ready()) {
                continue;
            }

            let addr = port.addr();
            let write = port.wen().unwrap_or(false);
            let be = port.be().unwrap_or(0);
            let wdata = port.wdata().unwrap_or(0);
            let rdata = port.rdata();

            self.ports[id.index()].active = false;

            let access = if write {
                let word = self.shadow.apply_write(addr, be, wdata);
                let record = LogRecord::new(Severity::Debug, self.tb.time(), "Write completed")
                    .field("port", id)
                    .field("addr", format!("{addr:#x}"))
                    .field("be", format!("{be:#x}"))
                    .field("word", format!("{word:#010x}"));
                self.tb.emit(record);
                Access::Write { be, data: wdata }
            } else {
                let expected = self.shadow.expected(addr);
                if rdata != expected {
                    let record = LogRecord::new(
                        Severity::AssertFailure,
                        self.tb.time(),
                        format!("Port {id}: Incorrect read. Expected {expected:#x}, read {rdata:#x}!"),
                    )
                    .field("port", id)
                    .field("addr", format!("{addr:#x}"))
                    .field("expected", format!("{expected:#010x}"))
                    .field("observed", format!("{rdata:#010x}"));
                    let kind = FailureKind::DataMismatch {
                        address: addr,
                        expected,
                        observed: rdata,
                    };
                    self.fail(kind, Some(id), record);
                }
                let record = LogRecord::new(Severity::Debug, self.tb.time(), "Read completed")
                    .field("port", id)
                    .field("addr", format!("{addr:#x}"))
                    .field("data", format!("{rdata:#010x}"));
                self.tb.emit(record);
                Access::Read { data: rdata }
            };

            self.completions.push(Completion {
                iteration: self.iteration,
                port: id,
                addr,
                access,
            });
        }
    }

    fn all_finished(&self) -> bool {
        self.ports.iter().all(|p| p.finished)
    }
}

/// Runs one scenario from reset until every sequence has drained or
/// `iteration_limit` is reached.
///
/// Failures never stop the run; they are collected in the returned report.
/// Ports are serviced in order 1, 2, 3 in both phases, so a write retired on a
/// lower port is visible to a same-cycle read on a higher one.
pub fn apply_request_sequence<D: XbarDut, S: LogSink>(
    tb: &mut Testbench<D, S>,
    delays: [u32; PERIPHERAL_COUNT],
    iteration_limit: u32,
    mut sequences: [RequestSequence; CONTROLLER_PORTS],
) -> TbResult<ScenarioReport> {
    let map = AddressMap::new(tb.dut().word_addr_width());

    for (peripheral, &delay) in delays.iter().enumerate() {
        tb.dut_mut().set_peripheral_delay(peripheral, delay);
    }
    for n in 1..=CONTROLLER_PORTS as u32 {
        tb.port(n)?.set_req(false);
    }
    tb.reset();

    let mut engine = Engine {
        tb,
        ports: [PortState::default(); CONTROLLER_PORTS],
        shadow: ShadowMemory::new(map),
        iteration: 0,
        failures: Vec::new(),
        completions: Vec::new(),
    };

    let outcome = loop {
        engine.iteration += 1;
        if engine.iteration >= iteration_limit {
            let record = LogRecord::new(
                Severity::Error,
                engine.tb.time(),
                "Iteration limit reached without completing test sequence!",
            )
            .field("limit", iteration_limit);
            engine.fail(FailureKind::Timeout { limit: iteration_limit }, None, record);
            break Outcome::Aborted;
        }

        engine.tb.step_to_stimulus();
        engine.feed(&mut sequences);

        engine.tb.step_to_response();
        engine.check_idle_ready();
        engine.collect_responses();

        if engine.all_finished() {
            break Outcome::Done;
        }
    };

    Ok(ScenarioReport {
        name: String::new(),
        outcome,
        iterations: engine.iteration,
        failures: engine.failures,
        completions: engine.completions,
        shadow: engine.shadow,
    })
}

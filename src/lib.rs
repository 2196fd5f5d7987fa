pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod port;
pub mod report;
pub mod request;
pub mod scenarios;
pub mod shadow;
#[cfg(feature = "verilator")]
pub mod simulator;
pub mod testbench;

pub use config::{AddressMap, HarnessConfig};
pub use engine::apply_request_sequence;
pub use error::{TbError, TbResult};
pub use model::BehavioralXbar;
pub use port::{PortId, PortSignal, PortView, XbarDut};
pub use report::{Outcome, RunSummary, ScenarioReport};
pub use request::{Request, RequestSequence};
pub use scenarios::{run_scenarios, Scenario, ScenarioBuilder};
pub use testbench::Testbench;

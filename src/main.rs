use clap::Parser;
use eyre::Result;
use xbar_tb::config::Backend;
use xbar_tb::scenarios::{self, Scenario};
use xbar_tb::{run_scenarios, AddressMap, BehavioralXbar, HarnessConfig, RunSummary, Testbench};

fn select_scenarios(config: &HarnessConfig) -> Result<Vec<Scenario>> {
    let map = AddressMap::default();
    if config.scenarios.is_empty() {
        return Ok(scenarios::all(map, config.seed, config.fuzz_requests)?);
    }
    let mut selected = Vec::new();
    for name in &config.scenarios {
        selected.extend(scenarios::by_name(name, map, config.seed, config.fuzz_requests)?);
    }
    Ok(selected)
}

#[cfg(feature = "verilator")]
fn run_verilated(config: &HarnessConfig, selected: Vec<Scenario>) -> Result<RunSummary> {
    use xbar_tb::simulator::{create_xbar_runtime, VerilatedXbar};

    let runtime = create_xbar_runtime(&config.artifacts)?;
    let mut dut = VerilatedXbar::create(&runtime)?;
    if !config.no_trace {
        if let Some(dir) = config.trace.parent() {
            std::fs::create_dir_all(dir)?;
        }
        println!("Tracing to {}..", config.trace);
        dut.trace_to(&config.trace);
    }

    let mut tb = Testbench::new(dut);
    Ok(run_scenarios(&mut tb, selected)?)
}

#[cfg(not(feature = "verilator"))]
fn run_verilated(_config: &HarnessConfig, _selected: Vec<Scenario>) -> Result<RunSummary> {
    eyre::bail!("xbar-tb was built without the `verilator` feature")
}

fn main() -> Result<()> {
    env_logger::init();
    let config = HarnessConfig::parse();
    println!("🚀 Starting Xbar TB..");

    let selected = select_scenarios(&config)?;
    let summary = match config.backend {
        Backend::Behavioral => {
            let mut tb = Testbench::new(BehavioralXbar::new());
            run_scenarios(&mut tb, selected)?
        }
        Backend::Verilator => run_verilated(&config, selected)?,
    };

    println!("Testbench finished.");
    for report in summary.scenarios.iter().filter(|r| !r.passed()) {
        println!("  {}: {} errors", report.name, report.error_count());
    }

    if summary.passed() {
        println!("🎉 OK.");
        Ok(())
    } else {
        println!("❌ {} errors!", summary.error_count());
        std::process::exit(summary.error_count().min(255) as i32);
    }
}

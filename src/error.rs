use thiserror::Error;

/// Configuration mistakes in scenario code. These abort immediately; anything
/// the DUT does wrong is recorded in a report instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TbError {
    /// Controller ports are numbered 1 to 3.
    #[error("illegal controller port {0}")]
    InvalidPort(u32),
    #[error("port {port}: slot {slot} is outside a sequence of {len} slots")]
    SlotOutOfRange { port: u32, slot: usize, len: usize },
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),
}

pub type TbResult<T> = Result<T, TbError>;

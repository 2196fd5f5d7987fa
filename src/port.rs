//! Signal-level seam between the harness and a crossbar model.
//!
//! Models expose their controller ports through [`XbarDut`]; the harness only
//! ever touches them through a [`PortView`], which knows the declared width
//! of every signal and whether the port can write.

use crate::config::CONTROLLER_PORTS;
use crate::error::{TbError, TbResult};

/// Controller port number, always in `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(u8);

impl PortId {
    pub fn new(n: u32) -> TbResult<Self> {
        if (1..=CONTROLLER_PORTS as u32).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(TbError::InvalidPort(n))
        }
    }

    /// All controller ports in service order.
    pub fn all() -> impl Iterator<Item = PortId> {
        (1..=CONTROLLER_PORTS as u8).map(PortId)
    }

    pub fn number(self) -> u32 {
        self.0 as u32
    }

    /// Zero-based index for per-port arrays.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Driven by the harness.
    Input,
    /// Driven by the model.
    Output,
}

/// Named signals of one controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSignal {
    Req,
    Ready,
    Addr,
    Rdata,
    Wen,
    Be,
    Wdata,
}

impl PortSignal {
    pub fn width(self, word_addr_width: u32) -> u32 {
        match self {
            PortSignal::Req | PortSignal::Ready | PortSignal::Wen => 1,
            PortSignal::Be => 4,
            PortSignal::Addr => word_addr_width,
            PortSignal::Rdata | PortSignal::Wdata => 32,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            PortSignal::Ready | PortSignal::Rdata => Direction::Output,
            _ => Direction::Input,
        }
    }

    /// Only present on write-capable ports.
    pub fn is_write_only(self) -> bool {
        matches!(self, PortSignal::Wen | PortSignal::Be | PortSignal::Wdata)
    }

    pub fn mask(self, word_addr_width: u32) -> u32 {
        match self.width(word_addr_width) {
            32 => u32::MAX,
            w => (1u32 << w) - 1,
        }
    }
}

/// A crossbar model with three controller ports and four peripherals.
///
/// `read`/`drive` on a write-only signal of a read-only port must read as 0
/// and ignore the value, respectively.
pub trait XbarDut {
    /// Evaluate the model against its current inputs.
    fn eval(&mut self);

    fn clk(&self) -> bool;
    fn set_clk(&mut self, high: bool);

    /// Active-low reset.
    fn set_rst_n(&mut self, high: bool);

    /// Response delay of a peripheral, interpreted only by the model.
    fn set_peripheral_delay(&mut self, peripheral: usize, delay: u32);

    fn read(&self, port: PortId, signal: PortSignal) -> u32;
    fn drive(&mut self, port: PortId, signal: PortSignal, value: u32);

    fn is_write_capable(&self, port: PortId) -> bool;

    fn word_addr_width(&self) -> u32;

    /// Capture the current signal values at `time`.
    fn dump(&mut self, _time: u64) {}
}

/// Borrowed accessor for one controller port.
pub struct PortView<'a, D: XbarDut + ?Sized> {
    dut: &'a mut D,
    id: PortId,
}

impl<'a, D: XbarDut + ?Sized> PortView<'a, D> {
    pub fn new(dut: &'a mut D, id: PortId) -> Self {
        Self { dut, id }
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn is_writable(&self) -> bool {
        self.dut.is_write_capable(self.id)
    }

    fn get(&self, signal: PortSignal) -> u32 {
        self.dut.read(self.id, signal) & signal.mask(self.dut.word_addr_width())
    }

    fn set(&mut self, signal: PortSignal, value: u32) {
        debug_assert_eq!(signal.direction(), Direction::Input);
        let value = value & signal.mask(self.dut.word_addr_width());
        self.dut.drive(self.id, signal, value);
    }

    pub fn req(&self) -> bool {
        self.get(PortSignal::Req) != 0
    }

    pub fn set_req(&mut self, on: bool) {
        self.set(PortSignal::Req, on as u32);
    }

    pub fn ready(&self) -> bool {
        self.get(PortSignal::Ready) != 0
    }

    pub fn addr(&self) -> u32 {
        self.get(PortSignal::Addr)
    }

    pub fn set_addr(&mut self, addr: u32) {
        self.set(PortSignal::Addr, addr);
    }

    pub fn rdata(&self) -> u32 {
        self.get(PortSignal::Rdata)
    }

    /// `None` on a read-only port.
    pub fn wen(&self) -> Option<bool> {
        self.is_writable().then(|| self.get(PortSignal::Wen) != 0)
    }

    pub fn be(&self) -> Option<u8> {
        self.is_writable().then(|| self.get(PortSignal::Be) as u8)
    }

    pub fn wdata(&self) -> Option<u32> {
        self.is_writable().then(|| self.get(PortSignal::Wdata))
    }

    /// Returns `false` without touching the model on a read-only port.
    pub fn set_wen(&mut self, on: bool) -> bool {
        if !self.is_writable() {
            return false;
        }
        self.set(PortSignal::Wen, on as u32);
        true
    }

    /// Drives write enable, byte enables and write data together.
    pub fn drive_write(&mut self, be: u8, wdata: u32) -> bool {
        if !self.set_wen(true) {
            return false;
        }
        self.set(PortSignal::Wdata, wdata);
        self.set(PortSignal::Be, be as u32);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehavioralXbar;

    #[test]
    fn port_numbers_outside_one_to_three_are_rejected() {
        assert_eq!(PortId::new(0), Err(TbError::InvalidPort(0)));
        assert_eq!(PortId::new(4), Err(TbError::InvalidPort(4)));
        assert_eq!(PortId::new(2).map(PortId::index), Ok(1));
    }

    #[test]
    fn ports_are_serviced_in_ascending_order() {
        let order: Vec<u32> = PortId::all().map(PortId::number).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn address_is_truncated_to_bus_width() -> TbResult<()> {
        let mut dut = BehavioralXbar::new();
        let mut port = PortView::new(&mut dut, PortId::new(2)?);
        port.set_addr(0xABCD_1234);
        assert_eq!(port.addr(), 0x1234);
        Ok(())
    }

    #[test]
    fn read_only_port_has_no_write_signals() -> TbResult<()> {
        let mut dut = BehavioralXbar::new();
        let mut port = PortView::new(&mut dut, PortId::new(1)?);
        assert!(!port.is_writable());
        assert!(!port.drive_write(0xF, 0x1234_5678));
        assert_eq!(port.wen(), None);
        assert_eq!(port.wdata(), None);

        let mut port = PortView::new(&mut dut, PortId::new(3)?);
        assert!(port.drive_write(0x13, 0x1234_5678));
        assert_eq!(port.wen(), Some(true));
        assert_eq!(port.be(), Some(0x3));
        assert_eq!(port.wdata(), Some(0x1234_5678));
        Ok(())
    }
}

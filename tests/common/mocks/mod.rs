pub mod cooler;
pub mod memory;
pub mod smbus;

pub use cooler::FakeCoolerBus;
pub use memory::FixedMemoryStatus;
pub use smbus::FakeSmbus;

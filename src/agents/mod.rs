pub mod decision_engine;
pub mod device;
pub mod file_resolver;
pub mod updater;

pub use decision_engine::{EngineConfig, UpdateDecision, UpdateDecisionEngine, UpdatePlan};
pub use device::{DeviceInfo, DeviceInventory, DeviceProvider, FixedDevice, select_single_device};
pub use updater::{UpdateLauncher, UpdaterProcess};

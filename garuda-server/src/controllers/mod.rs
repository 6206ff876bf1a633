//! The controller layer: one struct per pipeline stage, wired together by
//! [`CoreController`]. Every sub-controller reaches its siblings through a
//! [`crate::plugins::CoreHandle`] back-reference rather than a direct
//! pointer, so the cycle between `CoreController` and its owned
//! sub-controllers is broken the same way the original system breaks it: one
//! owner, many weak observers.

mod channels_controller;
mod core_controller;
mod logic_controller;
mod operations_controller;
mod permissions_controller;
mod push_controller;
mod sessions_controller;
mod storage_controller;

pub use channels_controller::{ChannelRegistry, ChannelsController, register_builtin_channels};
pub use core_controller::CoreController;
pub use logic_controller::LogicController;
pub use operations_controller::OperationsController;
pub use permissions_controller::PermissionsController;
pub use push_controller::PushController;
pub use sessions_controller::SessionsController;
pub use storage_controller::StorageController;

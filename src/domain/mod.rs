// 领域模型

pub mod analysis;
pub mod command_log;
pub mod device;
pub mod settings;
pub mod state;
pub mod status;

// 业务服务模块

pub mod camera;
pub mod classifier;
pub mod dispatcher;
pub mod keyboard;
pub mod poller;
pub mod sensor_simulator;
pub mod settings_store;
pub mod transport;

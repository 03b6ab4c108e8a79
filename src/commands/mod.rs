// 操作员命令层：控制台上的每个动作对应一个函数

pub mod console;
pub mod control;
pub mod monitoring;
pub mod settings;
pub mod surveillance;

use crate::domain::settings::DashboardSettings;
use crate::domain::state::{lock_state, shared, DashboardState, SharedState};
use crate::services::dispatcher::CommandDispatcher;
use crate::services::keyboard::{KeyBindings, KeyPreset, KeyboardController};
use crate::services::poller::StatusPoller;
use crate::services::settings_store::SettingsStore;
use crate::services::transport::DeviceTransport;
use std::sync::Arc;
use tokio::time::Duration;

/// 一个控制台会话持有的全部服务
pub struct Console<T: DeviceTransport> {
    pub dispatcher: Arc<CommandDispatcher<T>>,
    pub keyboard: KeyboardController,
    pub poller: StatusPoller<T>,
    pub store: Option<SettingsStore>,
}

impl<T: DeviceTransport> Console<T> {
    pub fn new(
        transport: Arc<T>,
        settings: DashboardSettings,
        store: Option<SettingsStore>,
        preset: KeyPreset,
        command_timeout: Duration,
    ) -> Self {
        let state = shared(DashboardState::new(settings));
        let dispatcher =
            Arc::new(CommandDispatcher::new(transport, state).with_timeout(command_timeout));
        let poller = StatusPoller::new(Arc::clone(&dispatcher));
        let mut keyboard = KeyboardController::new(KeyBindings::preset(preset));
        keyboard.install();
        Self {
            dispatcher,
            keyboard,
            poller,
            store,
        }
    }

    pub fn state(&self) -> &SharedState {
        self.dispatcher.state()
    }

    pub fn settings(&self) -> DashboardSettings {
        lock_state(self.state()).settings.clone()
    }

    /// 会话结束：卸载键盘绑定并停止轮询
    pub fn shutdown(&mut self) {
        self.keyboard.teardown();
        self.poller.stop();
    }
}

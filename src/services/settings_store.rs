// 设置持久化（SQLite 键值表）
use crate::domain::settings::DashboardSettings;
use anyhow::{Context, Result};
use rusqlite::{Connection, Result as SqlResult};
use std::path::PathBuf;

pub const DEFAULT_DB_FILE: &str = "farmbot.db";

pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(path) => path,
            None => std::env::current_dir()
                .context("Failed to resolve current directory")?
                .join(DEFAULT_DB_FILE),
        };

        let conn = Connection::open(&path)
            .context(format!("Failed to open settings database at {:?}", path))?;

        let store = Self { conn };
        store
            .init_schema()
            .context("Failed to initialize settings schema")?;
        Ok(store)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
        rows.next().transpose()
    }

    #[cfg(test)]
    pub fn set(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// 启动时读取一次；缺失的键保持默认值
    pub fn load(&self) -> Result<DashboardSettings> {
        let mut settings = DashboardSettings::default();
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings")
            .context("Failed to query settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .context("Failed to query settings")?;
        for row in rows {
            let (key, value) = row.context("Failed to read settings row")?;
            settings.apply_pair(&key, value);
        }
        Ok(settings)
    }

    /// 仅在显式保存时调用
    pub fn save(&mut self, settings: &DashboardSettings) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin settings transaction")?;
        for (key, value) in settings.to_pairs() {
            tx.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![key, value],
            )
            .context(format!("Failed to save setting {}", key))?;
        }
        tx.commit().context("Failed to commit settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::{DEFAULT_CAMERA_PORT, KEY_CAMERA_HOST};

    fn temp_db(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "farmbot-{}-{}-{}.db",
            name,
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn empty_store_loads_defaults() {
        let path = temp_db("defaults");
        let store = SettingsStore::new(Some(path.clone())).unwrap();

        let settings = store.load().unwrap();

        assert_eq!(settings, DashboardSettings::default());
        assert_eq!(settings.camera_port, DEFAULT_CAMERA_PORT);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn saved_settings_survive_reopen() {
        let path = temp_db("roundtrip");
        let mut settings = DashboardSettings::default();
        settings.motor_endpoint = "192.168.4.1".to_string();
        settings.camera_host = "192.168.50.130".to_string();
        {
            let mut store = SettingsStore::new(Some(path.clone())).unwrap();
            store.save(&settings).unwrap();
        }

        let store = SettingsStore::new(Some(path.clone())).unwrap();
        assert_eq!(store.load().unwrap(), settings);
        assert_eq!(
            store.get(KEY_CAMERA_HOST).unwrap().as_deref(),
            Some("192.168.50.130")
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn set_overwrites_single_key() {
        let path = temp_db("set");
        let store = SettingsStore::new(Some(path.clone())).unwrap();
        store.set("cameraPort", "9000").unwrap();
        store.set("cameraPort", "9001").unwrap();

        assert_eq!(store.load().unwrap().camera_port, "9001");
        assert_eq!(store.get("missing").unwrap(), None);
        let _ = std::fs::remove_file(path);
    }
}

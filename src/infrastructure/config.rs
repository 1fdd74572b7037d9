// Application configuration loaded from config/app.toml with coded defaults
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub gateway: GatewaySettings,
    pub persistence: PersistenceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Local simulator, no gateway required.
    Demo,
    /// Poll the gateway endpoints.
    Gateway,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSettings {
    pub mode: FeedMode,
    pub poll_interval_secs: u64,
    pub history_window_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceSettings {
    pub host: String,
    pub dashboard_name: String,
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("data.mode", "demo")?
        .set_default("data.poll_interval_secs", 2)?
        .set_default("data.history_window_hours", 24)?
        .set_default("gateway.host", "http://localhost:9000")?
        .set_default("persistence.host", "http://localhost:9100")?
        .set_default("persistence.dashboard_name", "Factory Overview")?
        .add_source(config::File::with_name("config/app").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

use crate::events::ConfigEvent;
use crate::item::{ActionItem, ItemBorder, ItemKind};
use crate::menu::{DEFAULT_DEAD_ZONE_RADIUS, Point};
use crate::ring::RingList;
use async_channel::Sender;
use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Open rings around the cursor instead of at a fixed position.
    pub appear_at_cursor: bool,
    /// Fixed ring position relative to the viewport center.
    pub center_offset: Point,
    pub auto_center_cursor: bool,
    pub keybind_passthrough: bool,
    pub escape_to_close: bool,
    pub dead_zone_radius: f32,
    pub draw_ring_background: bool,
    /// Grow the hovered icon.
    pub animate_icon_sizes: bool,
    /// Seconds between two activations of the same ring that count as a double activation.
    pub double_activation_window: f32,
    pub default_border: ItemBorder,
    pub rings: RingList,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            appear_at_cursor: true,
            center_offset: Point::default(),
            auto_center_cursor: false,
            keybind_passthrough: false,
            escape_to_close: true,
            dead_zone_radius: DEFAULT_DEAD_ZONE_RADIUS,
            draw_ring_background: true,
            animate_icon_sizes: true,
            double_activation_window: 0.3,
            default_border: ItemBorder::default(),
            rings: RingList::default(),
        }
    }
}

impl Settings {
    pub fn double_activation_window(&self) -> Duration {
        Duration::try_from_secs_f32(self.double_activation_window).unwrap_or_default()
    }

    /// Clamps values that may have been edited by hand.
    pub fn sanitize(&mut self) {
        self.dead_zone_radius = self.dead_zone_radius.max(0.0);
        self.default_border.set_thickness(self.default_border.thickness);
        self.default_border.set_radius(self.default_border.radius);
        for ring in self.rings.iter_mut() {
            ring.sanitize();
        }
    }

    /// New items start with the configured default border.
    pub fn new_item(&self, kind: ItemKind) -> ActionItem {
        ActionItem::with_border(kind, self.default_border)
    }

    /// Root ring center for the given cursor and viewport size.
    pub fn ring_center(&self, cursor: Point, viewport: Point) -> Point {
        if self.appear_at_cursor {
            cursor
        } else {
            Point::new(
                viewport.x / 2.0 + self.center_offset.x,
                viewport.y / 2.0 + self.center_offset.y,
            )
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "spoke", "spoke").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("SPOKE"))
        .build()?;

    let mut settings: Settings = s.try_deserialize()?;
    settings.sanitize();
    Ok(settings)
}

pub fn load_or_default(path: &Path) -> Settings {
    match load_config_from(path) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, toml::to_string_pretty(settings)?)?;
    Ok(())
}

pub fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(path, DEFAULT_CONFIG)?;
    }
    Ok(())
}

pub const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Sends [`ConfigEvent::Reload`] whenever the file at `config_path` changes.
/// Returns when the receiving side goes away or the watcher cannot start.
pub async fn run_async_watcher(config_path: PathBuf, tx: Sender<ConfigEvent>) {
    let config_dir = match config_path.parent() {
        Some(p) => p.to_path_buf(),
        None => return,
    };

    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create watcher: {}", e);
            return;
        }
    };

    if let Err(e) = watcher.watch(&config_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch config directory: {}", e);
        return;
    }

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let meaningful_event = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if meaningful_event
                    && event.paths.iter().any(|p| p == &config_path)
                    && tx.send(ConfigEvent::Reload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}

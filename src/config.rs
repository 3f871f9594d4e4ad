/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD, or the
/// shared data directories. Falls back to defaults if the file is missing,
/// incomplete or malformed.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "pathways";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub timing: TimingConfig,
    pub swipe: SwipeConfig,
    pub connector: ConnectorConfig,
    pub gamepad: GamepadConfig,
    /// Content file; `None` uses the built-in essay.
    pub content: Option<PathBuf>,
    pub layout: LayoutMode,
    pub mobile_max_width: u16,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub animation_clear_ms: u64,
    pub collapse_grace_ms: u64,
    pub outside_click_guard_ms: u64,
    pub frame_ms: u64,
}

#[derive(Clone, Debug)]
pub struct SwipeConfig {
    pub min_distance: i32,
    pub slop: i32,
}

#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    pub overshoot: i32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub advance: Vec<String>,
    pub back: Vec<String>,
    pub close: Vec<String>,
    pub start_over: Vec<String>,
    pub overview: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LayoutMode {
    Desktop,
    Mobile,
    #[default]
    Auto,
}

impl LayoutMode {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => LayoutMode::Desktop,
            "mobile" => LayoutMode::Mobile,
            "auto" | "" => LayoutMode::Auto,
            other => {
                log::warn!("unknown layout {other:?} in config.toml; using auto");
                LayoutMode::Auto
            }
        }
    }

    /// Whether a terminal `width` columns wide gets the mobile layout.
    pub fn is_mobile(self, width: u16, mobile_max_width: u16) -> bool {
        match self {
            LayoutMode::Desktop => false,
            LayoutMode::Mobile => true,
            LayoutMode::Auto => width < mobile_max_width,
        }
    }
}

impl TimingConfig {
    pub fn animation_clear(&self) -> Duration {
        Duration::from_millis(self.animation_clear_ms)
    }

    pub fn collapse_grace(&self) -> Duration {
        Duration::from_millis(self.collapse_grace_ms)
    }

    pub fn click_guard(&self) -> Duration {
        Duration::from_millis(self.outside_click_guard_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    swipe: TomlSwipe,
    #[serde(default)]
    connector: TomlConnector,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_animation_clear")]
    animation_clear_ms: u64,
    #[serde(default = "default_collapse_grace")]
    collapse_grace_ms: u64,
    #[serde(default = "default_click_guard")]
    outside_click_guard_ms: u64,
    #[serde(default = "default_frame")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlSwipe {
    #[serde(default = "default_swipe_distance")]
    min_distance: i32,
    #[serde(default = "default_swipe_slop")]
    slop: i32,
}

#[derive(Deserialize, Debug)]
struct TomlConnector {
    #[serde(default = "default_overshoot")]
    overshoot: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_continue", rename = "continue")]
    advance: Vec<String>,
    #[serde(default = "default_pad_back")]
    back: Vec<String>,
    #[serde(default = "default_pad_close")]
    close: Vec<String>,
    #[serde(default = "default_pad_start_over")]
    start_over: Vec<String>,
    #[serde(default = "default_pad_overview")]
    overview: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    content: String,
    #[serde(default = "default_layout")]
    layout: String,
    #[serde(default = "default_mobile_max_width")]
    mobile_max_width: u16,
}

// ── Defaults ──

fn default_animation_clear() -> u64 { 400 }
fn default_collapse_grace() -> u64 { 350 }
fn default_click_guard() -> u64 { 10 }
fn default_frame() -> u64 { 16 }
fn default_swipe_distance() -> i32 { 50 }
fn default_swipe_slop() -> i32 { 10 }
fn default_overshoot() -> i32 { 2 }

fn default_pad_continue() -> Vec<String> { vec!["A".into(), "R1".into()] }
fn default_pad_back() -> Vec<String> { vec!["B".into(), "L1".into()] }
fn default_pad_close() -> Vec<String> { vec!["Select".into()] }
fn default_pad_start_over() -> Vec<String> { vec!["Start".into()] }
fn default_pad_overview() -> Vec<String> { vec!["Y".into()] }
fn default_layout() -> String { "auto".into() }
fn default_mobile_max_width() -> u16 { 100 }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            animation_clear_ms: default_animation_clear(),
            collapse_grace_ms: default_collapse_grace(),
            outside_click_guard_ms: default_click_guard(),
            frame_ms: default_frame(),
        }
    }
}

impl Default for TomlSwipe {
    fn default() -> Self {
        TomlSwipe {
            min_distance: default_swipe_distance(),
            slop: default_swipe_slop(),
        }
    }
}

impl Default for TomlConnector {
    fn default() -> Self {
        TomlConnector { overshoot: default_overshoot() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            advance: default_pad_continue(),
            back: default_pad_back(),
            close: default_pad_close(),
            start_over: default_pad_start_over(),
            overview: default_pad_overview(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            content: String::new(),
            layout: default_layout(),
            mobile_max_width: default_mobile_max_width(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TomlTiming::default().into()
    }
}

impl Default for SwipeConfig {
    fn default() -> Self {
        TomlSwipe::default().into()
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        TomlConnector::default().into()
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        TomlGamepad::default().into()
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            animation_clear_ms: t.animation_clear_ms,
            collapse_grace_ms: t.collapse_grace_ms,
            outside_click_guard_ms: t.outside_click_guard_ms,
            frame_ms: t.frame_ms,
        }
    }
}

impl From<TomlSwipe> for SwipeConfig {
    fn from(s: TomlSwipe) -> Self {
        SwipeConfig {
            min_distance: s.min_distance,
            slop: s.slop,
        }
    }
}

impl From<TomlConnector> for ConnectorConfig {
    fn from(c: TomlConnector) -> Self {
        ConnectorConfig { overshoot: c.overshoot }
    }
}

impl From<TomlGamepad> for GamepadConfig {
    fn from(g: TomlGamepad) -> Self {
        GamepadConfig {
            advance: g.advance,
            back: g.back,
            close: g.close,
            start_over: g.start_over,
            overview: g.overview,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig::resolve(TomlConfig::default(), &[])
    }
}

// ── Loading ──

impl AppConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, ~/.local/share/pathways,
    /// /usr/share/pathways. Missing file or keys fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        AppConfig::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (no directory search).
    pub fn from_toml_str(text: &str) -> Self {
        let toml_cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config.toml parse error: {e}; using default settings");
                TomlConfig::default()
            }
        };
        AppConfig::resolve(toml_cfg, &[])
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let content = resolve_content(&toml_cfg.general.content, search_dirs);
        AppConfig {
            timing: toml_cfg.timing.into(),
            swipe: toml_cfg.swipe.into(),
            connector: toml_cfg.connector.into(),
            gamepad: toml_cfg.gamepad.into(),
            content,
            layout: LayoutMode::parse(&toml_cfg.general.layout),
            mobile_max_width: toml_cfg.general.mobile_max_width,
        }
    }
}

/// Relative content paths are looked up in the candidate directories.
fn resolve_content(raw: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Some(path);
    }
    let found = search_dirs
        .iter()
        .map(|d| d.join(&path))
        .find(|p| p.is_file())
        .unwrap_or(path);
    Some(found)
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds files next to
        // the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        push_unique(&mut dirs, cwd);
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() {
            push_unique(&mut dirs, xdg);
        }
    }

    let sys = Path::new("/usr/share").join(APP_DIR);
    if sys.is_dir() {
        push_unique(&mut dirs, sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn push_unique(dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if !dirs.iter().any(|d| d == &dir) {
        dirs.push(dir);
    }
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    log::info!("config loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("{}: parse error: {e}; using default settings", path.display());
                    return TomlConfig::default();
                }
            },
            Err(e) => log::warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}

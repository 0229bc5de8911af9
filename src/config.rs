use crate::geometry::Color;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScancamConfig {
    pub viewfinder: ViewfinderConfig,
    pub session: SessionConfig,
    pub display: DisplayConfig,
}

/// Rendering and animation settings for the viewfinder overlay
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ViewfinderConfig {
    /// Colour used to darken everything outside the framing rect
    #[serde(default = "default_mask_color")]
    pub mask_color: Color,

    /// Scan-line style: solid pulsing bar or stretched bitmap
    #[serde(default = "default_laser_style")]
    pub laser_style: LaserStyle,

    #[serde(default = "default_laser_color")]
    pub laser_color: Color,

    /// Optional image for the bitmap scan-line style
    pub laser_bitmap_path: Option<String>,

    /// Colour of candidate points drawn on the overlay
    #[serde(default = "default_result_point_color")]
    pub result_point_color: Color,

    /// Colour of the lines/dots drawn onto a decoded frame
    #[serde(default = "default_highlight_color")]
    pub highlight_color: Color,

    #[serde(default = "default_corner_color")]
    pub corner_color: Color,

    #[serde(default = "default_corner_length")]
    pub corner_length: i32,

    #[serde(default = "default_corner_thickness")]
    pub corner_thickness: i32,

    /// Distance the scan line moves per draw, in pixels
    #[serde(default = "default_scanning_distance")]
    pub scanning_distance: i32,

    #[serde(default = "default_laser_height")]
    pub laser_height: i32,

    /// Prompt shown beneath the framing rect
    #[serde(default = "default_tip_text")]
    pub tip_text: String,

    #[serde(default = "default_tip_text_color")]
    pub tip_text_color: Color,

    #[serde(default = "default_tip_text_size")]
    pub tip_text_size: f32,

    #[serde(default = "default_tip_text_alpha")]
    pub tip_text_alpha: u8,

    /// Gap between the framing rect and the prompt baseline, in dp
    #[serde(default = "default_tip_text_margin_top")]
    pub tip_text_margin_top: i32,

    /// TrueType font used for the prompt
    pub tip_text_font_path: Option<String>,

    /// Pixels per dp
    #[serde(default = "default_density")]
    pub density: f32,

    /// Delay between overlay redraws in milliseconds
    #[serde(default = "default_animation_delay_ms")]
    pub animation_delay_ms: u64,

    #[serde(default = "default_current_point_opacity")]
    pub current_point_opacity: u8,

    /// Initial capacity of the candidate point buffers
    #[serde(default = "default_possible_point_num")]
    pub possible_point_num: usize,

    /// Candidate point count that triggers a trim to half
    #[serde(default = "default_max_result_points")]
    pub max_result_points: usize,

    /// Radius of a current-generation candidate point
    #[serde(default = "default_possible_point_size")]
    pub possible_point_size: i32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_scan_mode")]
    pub mode: ScanMode,

    #[serde(default = "default_orientation_strategy")]
    pub orientation: OrientationStrategy,

    /// Delay before the preview restarts after a failed decode
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Inactivity period that ends the session
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Display resolution (width, height)
    #[serde(default = "default_display_resolution")]
    pub resolution: (u32, u32),

    /// Camera preview resolution (width, height)
    #[serde(default = "default_preview_resolution")]
    pub preview_resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LaserStyle {
    Bar,
    Bitmap,
}

/// How decode results end or continue the session
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Keep scanning across failed attempts
    Continuous,
    /// End on the first decoded text and restart preview on entry
    SingleShot,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrientationStrategy {
    /// Rotation left to the host; no monitor
    Locked,
    /// Track sensor rotation and relaunch on 90/270 flips
    Sensor,
}

impl ViewfinderConfig {
    pub fn animation_delay(&self) -> Duration {
        Duration::from_millis(self.animation_delay_ms)
    }

    /// Prompt margin converted from dp to pixels
    pub fn tip_text_margin_px(&self) -> i32 {
        (self.tip_text_margin_top as f32 * self.density).round() as i32
    }
}

impl SessionConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

impl ScancamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("scancam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("viewfinder.mask_color", default_mask_color().0 as i64)?
            .set_default("viewfinder.laser_style", "bar")?
            .set_default("viewfinder.laser_color", default_laser_color().0 as i64)?
            .set_default(
                "viewfinder.result_point_color",
                default_result_point_color().0 as i64,
            )?
            .set_default(
                "viewfinder.highlight_color",
                default_highlight_color().0 as i64,
            )?
            .set_default("viewfinder.corner_color", default_corner_color().0 as i64)?
            .set_default("viewfinder.corner_length", default_corner_length() as i64)?
            .set_default(
                "viewfinder.corner_thickness",
                default_corner_thickness() as i64,
            )?
            .set_default(
                "viewfinder.scanning_distance",
                default_scanning_distance() as i64,
            )?
            .set_default("viewfinder.laser_height", default_laser_height() as i64)?
            .set_default("viewfinder.tip_text", default_tip_text())?
            .set_default(
                "viewfinder.tip_text_color",
                default_tip_text_color().0 as i64,
            )?
            .set_default("viewfinder.tip_text_size", default_tip_text_size() as f64)?
            .set_default("viewfinder.tip_text_alpha", default_tip_text_alpha() as i64)?
            .set_default(
                "viewfinder.tip_text_margin_top",
                default_tip_text_margin_top() as i64,
            )?
            .set_default("viewfinder.density", default_density() as f64)?
            .set_default(
                "viewfinder.animation_delay_ms",
                default_animation_delay_ms() as i64,
            )?
            .set_default(
                "viewfinder.current_point_opacity",
                default_current_point_opacity() as i64,
            )?
            .set_default(
                "viewfinder.possible_point_num",
                default_possible_point_num() as i64,
            )?
            .set_default(
                "viewfinder.max_result_points",
                default_max_result_points() as i64,
            )?
            .set_default(
                "viewfinder.possible_point_size",
                default_possible_point_size() as i64,
            )?
            .set_default("session.mode", "continuous")?
            .set_default("session.orientation", "locked")?
            .set_default(
                "session.restart_delay_ms",
                default_restart_delay_ms() as i64,
            )?
            .set_default(
                "session.inactivity_timeout_secs",
                default_inactivity_timeout_secs() as i64,
            )?
            .set_default(
                "display.resolution",
                vec![
                    default_display_resolution().0,
                    default_display_resolution().1,
                ],
            )?
            .set_default(
                "display.preview_resolution",
                vec![
                    default_preview_resolution().0,
                    default_preview_resolution().1,
                ],
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with SCANCAM__ prefix
            .add_source(Environment::with_prefix("SCANCAM").separator("__"))
            .build()?;

        let config: ScancamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewfinder = &self.viewfinder;

        if viewfinder.corner_length <= 0 || viewfinder.corner_thickness <= 0 {
            return Err(ConfigError::Message(
                "Corner length and thickness must be greater than 0".to_string(),
            ));
        }

        if viewfinder.scanning_distance <= 0 {
            return Err(ConfigError::Message(
                "Scanning distance must be greater than 0".to_string(),
            ));
        }

        if viewfinder.laser_height <= 0 {
            return Err(ConfigError::Message(
                "Laser height must be greater than 0".to_string(),
            ));
        }

        if viewfinder.animation_delay_ms == 0 {
            return Err(ConfigError::Message(
                "Animation delay must be greater than 0".to_string(),
            ));
        }

        if viewfinder.max_result_points == 0 {
            return Err(ConfigError::Message(
                "max_result_points must be greater than 0".to_string(),
            ));
        }

        if viewfinder.possible_point_size < 0 {
            return Err(ConfigError::Message(
                "possible_point_size must not be negative".to_string(),
            ));
        }

        if viewfinder.density <= 0.0 || viewfinder.tip_text_size <= 0.0 {
            return Err(ConfigError::Message(
                "Density and tip text size must be greater than 0".to_string(),
            ));
        }

        let (width, height) = self.display.resolution;
        let (preview_width, preview_height) = self.display.preview_resolution;
        if width == 0 || height == 0 || preview_width == 0 || preview_height == 0 {
            return Err(ConfigError::Message(
                "Display and preview resolution must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ViewfinderConfig {
    fn default() -> Self {
        Self {
            mask_color: default_mask_color(),
            laser_style: default_laser_style(),
            laser_color: default_laser_color(),
            laser_bitmap_path: None,
            result_point_color: default_result_point_color(),
            highlight_color: default_highlight_color(),
            corner_color: default_corner_color(),
            corner_length: default_corner_length(),
            corner_thickness: default_corner_thickness(),
            scanning_distance: default_scanning_distance(),
            laser_height: default_laser_height(),
            tip_text: default_tip_text(),
            tip_text_color: default_tip_text_color(),
            tip_text_size: default_tip_text_size(),
            tip_text_alpha: default_tip_text_alpha(),
            tip_text_margin_top: default_tip_text_margin_top(),
            tip_text_font_path: None,
            density: default_density(),
            animation_delay_ms: default_animation_delay_ms(),
            current_point_opacity: default_current_point_opacity(),
            possible_point_num: default_possible_point_num(),
            max_result_points: default_max_result_points(),
            possible_point_size: default_possible_point_size(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: default_scan_mode(),
            orientation: default_orientation_strategy(),
            restart_delay_ms: default_restart_delay_ms(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            resolution: default_display_resolution(),
            preview_resolution: default_preview_resolution(),
        }
    }
}

impl Default for ScancamConfig {
    fn default() -> Self {
        Self {
            viewfinder: ViewfinderConfig::default(),
            session: SessionConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

// Default value functions
fn default_mask_color() -> Color {
    Color(0x6000_0000)
}
fn default_laser_style() -> LaserStyle {
    LaserStyle::Bar
}
fn default_laser_color() -> Color {
    Color(0xFFCC_0000)
}
fn default_result_point_color() -> Color {
    Color(0xC0FF_BD21)
}
fn default_highlight_color() -> Color {
    Color(0xC099_CC00)
}
fn default_corner_color() -> Color {
    Color::GREEN
}
fn default_corner_length() -> i32 {
    40
}
fn default_corner_thickness() -> i32 {
    8
}
fn default_scanning_distance() -> i32 {
    6
}
fn default_laser_height() -> i32 {
    4
}
fn default_tip_text() -> String {
    "Place a barcode inside the viewfinder rectangle to scan it.".to_string()
}
fn default_tip_text_color() -> Color {
    Color::WHITE
}
fn default_tip_text_size() -> f32 {
    28.0
}
fn default_tip_text_alpha() -> u8 {
    0xFF
}
fn default_tip_text_margin_top() -> i32 {
    30
}
fn default_density() -> f32 {
    1.0
}
fn default_animation_delay_ms() -> u64 {
    80
}
fn default_current_point_opacity() -> u8 {
    0xA0
}
fn default_possible_point_num() -> usize {
    5
}
fn default_max_result_points() -> usize {
    20
}
fn default_possible_point_size() -> i32 {
    6
}

fn default_scan_mode() -> ScanMode {
    ScanMode::Continuous
}
fn default_orientation_strategy() -> OrientationStrategy {
    OrientationStrategy::Locked
}
fn default_restart_delay_ms() -> u64 {
    500
}
fn default_inactivity_timeout_secs() -> u64 {
    300
}

fn default_display_resolution() -> (u32, u32) {
    (480, 800)
}
fn default_preview_resolution() -> (u32, u32) {
    (640, 480)
}

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::control::{Mode, PdGains};
use crate::detect::{bright_spot::DEFAULT_THRESHOLD, DetectionParams};
use crate::frame::FrameGeometry;
use crate::runtime::ReconnectPolicy;
use crate::tracker::TrackerSettings;

const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_SOURCE_URL: &str = "stub://face";
const DEFAULT_SOURCE_FPS: u32 = 30;
const DEFAULT_DETECTOR: &str = "bright_spot";
const DEFAULT_TRANSPORT_ADDRESS: &str = "/dev/ttyACM0";
const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 200;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    frame: Option<FrameConfigFile>,
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    control: Option<ControlConfigFile>,
    transport: Option<TransportConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    scale_factor: Option<f64>,
    min_neighbors: Option<u32>,
    script_path: Option<PathBuf>,
    threshold: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct ControlConfigFile {
    mode: Option<Mode>,
    yaw: Option<PdGains>,
    pitch: Option<PdGains>,
}

#[derive(Debug, Deserialize, Default)]
struct TransportConfigFile {
    kind: Option<TransportKind>,
    address: Option<String>,
    baud_rate: Option<u32>,
    digits: Option<usize>,
    write_timeout_ms: Option<u64>,
    reconnect: Option<ReconnectConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ReconnectConfigFile {
    max_attempts: Option<u32>,
    delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub frame: FrameGeometry,
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub control: ControlSettings,
    pub transport: TransportSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    /// Pacing for synthetic sources; 0 runs unpaced.
    pub target_fps: u32,
    /// Stop after this many frames. `None` runs until interrupted.
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub params: DetectionParams,
    pub script_path: Option<PathBuf>,
    pub threshold: u8,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DETECTOR.to_string(),
            params: DetectionParams::default(),
            script_path: None,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlSettings {
    pub mode: Mode,
    /// Explicit gains; `None` falls back to the mode's defaults.
    pub yaw: Option<PdGains>,
    pub pitch: Option<PdGains>,
}

impl ControlSettings {
    pub fn yaw_gains(&self) -> PdGains {
        self.yaw.unwrap_or_else(|| self.mode.default_gains())
    }

    pub fn pitch_gains(&self) -> PdGains {
        self.pitch.unwrap_or_else(|| self.mode.default_gains())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Serial,
    /// Print frames to stdout instead of writing to hardware.
    Console,
}

impl FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(TransportKind::Serial),
            "console" => Ok(TransportKind::Console),
            other => Err(anyhow!(
                "unknown transport '{}' (expected serial or console)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub kind: TransportKind,
    pub address: String,
    pub baud_rate: u32,
    /// Explicit digit width; `None` uses the narrowest width the mode allows.
    pub digits: Option<usize>,
    pub write_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl TrackerConfig {
    /// Load from the file named by `GIMBAL_CONFIG` (if set), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GIMBAL_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like `load`, with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrackerConfigFile) -> Self {
        let frame_file = file.frame.unwrap_or_default();
        let source_file = file.source.unwrap_or_default();
        let detector_file = file.detector.unwrap_or_default();
        let control_file = file.control.unwrap_or_default();
        let transport_file = file.transport.unwrap_or_default();
        let reconnect_file = transport_file.reconnect.unwrap_or_default();

        let defaults = DetectionParams::default();
        Self {
            frame: FrameGeometry::new(
                frame_file.width.unwrap_or(DEFAULT_FRAME_WIDTH),
                frame_file.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
            ),
            source: SourceSettings {
                url: source_file
                    .url
                    .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                target_fps: source_file.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
                max_frames: source_file.max_frames,
            },
            detector: DetectorSettings {
                backend: detector_file
                    .backend
                    .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
                params: DetectionParams {
                    scale_factor: detector_file.scale_factor.unwrap_or(defaults.scale_factor),
                    min_neighbors: detector_file.min_neighbors.unwrap_or(defaults.min_neighbors),
                },
                script_path: detector_file.script_path,
                threshold: detector_file.threshold.unwrap_or(DEFAULT_THRESHOLD),
            },
            control: ControlSettings {
                mode: control_file.mode.unwrap_or(Mode::AbsoluteAngle),
                yaw: control_file.yaw,
                pitch: control_file.pitch,
            },
            transport: TransportSettings {
                kind: transport_file.kind.unwrap_or(TransportKind::Serial),
                address: transport_file
                    .address
                    .unwrap_or_else(|| DEFAULT_TRANSPORT_ADDRESS.to_string()),
                baud_rate: transport_file.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
                digits: transport_file.digits,
                write_timeout: Duration::from_millis(
                    transport_file
                        .write_timeout_ms
                        .unwrap_or(DEFAULT_WRITE_TIMEOUT_MS),
                ),
                reconnect: ReconnectPolicy {
                    max_attempts: reconnect_file.max_attempts.unwrap_or(0),
                    delay: Duration::from_millis(
                        reconnect_file
                            .delay_ms
                            .unwrap_or(DEFAULT_RECONNECT_DELAY_MS),
                    ),
                },
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(mode) = env_nonempty("GIMBAL_MODE") {
            self.control.mode = mode.parse()?;
        }
        if let Some(kind) = env_nonempty("GIMBAL_TRANSPORT") {
            self.transport.kind = kind.parse()?;
        }
        if let Some(address) = env_nonempty("GIMBAL_TRANSPORT_ADDRESS") {
            self.transport.address = address;
        }
        if let Some(baud) = env_nonempty("GIMBAL_BAUD_RATE") {
            self.transport.baud_rate = baud
                .parse()
                .map_err(|_| anyhow!("GIMBAL_BAUD_RATE must be an integer"))?;
        }
        if let Some(digits) = env_nonempty("GIMBAL_DIGITS") {
            self.transport.digits = Some(
                digits
                    .parse()
                    .map_err(|_| anyhow!("GIMBAL_DIGITS must be an integer"))?,
            );
        }
        if let Some(backend) = env_nonempty("GIMBAL_DETECTOR") {
            self.detector.backend = backend;
        }
        if let Some(url) = env_nonempty("GIMBAL_SOURCE_URL") {
            self.source.url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(anyhow!(
                "frame dimensions must be non-zero (got {}x{})",
                self.frame.width,
                self.frame.height
            ));
        }
        self.detector.params.validate()?;
        if self.detector.backend.trim().is_empty() {
            return Err(anyhow!("detector backend must be named"));
        }
        if self.detector.backend == "scripted" && self.detector.script_path.is_none() {
            return Err(anyhow!("scripted detector requires detector.script_path"));
        }
        if !self.control.yaw_gains().is_finite() || !self.control.pitch_gains().is_finite() {
            return Err(anyhow!("controller gains must be finite numbers"));
        }
        let min_digits = self.control.mode.min_digits();
        if self.digits() < min_digits {
            return Err(anyhow!(
                "{} mode needs at least {} digits per value (configured {})",
                self.control.mode,
                min_digits,
                self.digits()
            ));
        }
        if self.transport.baud_rate == 0 {
            return Err(anyhow!("baud_rate must be greater than zero"));
        }
        if self.transport.kind == TransportKind::Serial && self.transport.address.trim().is_empty()
        {
            return Err(anyhow!("serial transport requires an address"));
        }
        Ok(())
    }

    /// Digit width used for every command value.
    pub fn digits(&self) -> usize {
        self.transport
            .digits
            .unwrap_or_else(|| self.control.mode.min_digits())
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            mode: self.control.mode,
            geometry: self.frame,
            yaw: self.control.yaw_gains(),
            pitch: self.control.pitch_gains(),
            digits: self.digits(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<TrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_rig() {
        let cfg = TrackerConfig::from_file(TrackerConfigFile::default());
        assert_eq!(cfg.frame, FrameGeometry::new(640, 480));
        assert_eq!(cfg.control.mode, Mode::AbsoluteAngle);
        assert_eq!(cfg.control.yaw_gains(), PdGains::new(0.6, 0.1));
        assert_eq!(cfg.detector.params.scale_factor, 1.08);
        assert_eq!(cfg.detector.params.min_neighbors, 10);
        assert_eq!(cfg.transport.address, "/dev/ttyACM0");
        assert_eq!(cfg.transport.baud_rate, 9600);
        assert_eq!(cfg.digits(), 3);
        assert_eq!(cfg.transport.reconnect.max_attempts, 0);
        cfg.validate().unwrap();
    }

    #[test]
    fn rate_mode_widens_default_digits_and_switches_gains() {
        let mut cfg = TrackerConfig::from_file(TrackerConfigFile::default());
        cfg.control.mode = Mode::RateCommand;
        assert_eq!(cfg.digits(), 4);
        assert_eq!(cfg.control.pitch_gains(), PdGains::new(0.4, 0.4));
        cfg.validate().unwrap();

        cfg.transport.digits = Some(3);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_detection_params() {
        let mut cfg = TrackerConfig::from_file(TrackerConfigFile::default());
        cfg.detector.params.scale_factor = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = TrackerConfig::from_file(TrackerConfigFile::default());
        cfg.detector.params.min_neighbors = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn scripted_detector_needs_a_script() {
        let mut cfg = TrackerConfig::from_file(TrackerConfigFile::default());
        cfg.detector.backend = "scripted".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_toml_sections() {
        let raw = r#"
            [frame]
            width = 320
            height = 240

            [control]
            mode = "rate_command"
            yaw = { kp = 0.5, kd = 0.2 }

            [transport]
            kind = "console"
            digits = 5
            reconnect = { max_attempts = 3, delay_ms = 10 }
        "#;
        let file: TrackerConfigFile = toml::from_str(raw).unwrap();
        let cfg = TrackerConfig::from_file(file);
        assert_eq!(cfg.frame, FrameGeometry::new(320, 240));
        assert_eq!(cfg.control.mode, Mode::RateCommand);
        assert_eq!(cfg.control.yaw_gains(), PdGains::new(0.5, 0.2));
        assert_eq!(cfg.control.pitch_gains(), PdGains::new(0.4, 0.4));
        assert_eq!(cfg.transport.kind, TransportKind::Console);
        assert_eq!(cfg.digits(), 5);
        assert_eq!(cfg.transport.reconnect.max_attempts, 3);
        assert_eq!(cfg.transport.reconnect.delay, Duration::from_millis(10));
    }
}

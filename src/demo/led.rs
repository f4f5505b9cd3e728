//! In-memory LED strip driven by the demo's outer loop
//!
//! There is no pixel hardware behind this; the strip holds the frame an
//! output driver would push, and the HTTP handlers only change its settings.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];

/// Default color, restored when switching modes while the strip is dark
pub const DEFAULT_RGB: Rgb = [0xff, 0x00, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Solid,
    Rainbow,
    Cylon,
    Confetti,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solid" => Ok(Self::Solid),
            "rainbow" => Ok(Self::Rainbow),
            "cylon" => Ok(Self::Cylon),
            "confetti" => Ok(Self::Confetti),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Solid => "solid",
            Self::Rainbow => "rainbow",
            Self::Cylon => "cylon",
            Self::Confetti => "confetti",
        };
        f.write_str(name)
    }
}

/// Settings reported by the API and saved between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedSettings {
    pub status: String,
    /// `#rrggbb`
    pub rgb: String,
    pub mode: Mode,
}

impl Default for LedSettings {
    fn default() -> Self {
        Self {
            status: "online".to_string(),
            rgb: rgb_to_hex(DEFAULT_RGB),
            mode: Mode::Cylon,
        }
    }
}

/// JSON body of every API response
#[derive(Debug, Serialize)]
pub struct LedReport<'a> {
    #[serde(flatten)]
    pub settings: &'a LedSettings,
    /// Seconds since the last on/off/set command
    pub uptime: f64,
}

#[derive(Debug)]
pub struct LedStrip {
    pixels: Vec<Rgb>,
    settings: LedSettings,
    started: Instant,
    changed: Instant,
    last_confetti: Instant,
}

impl LedStrip {
    pub fn new(count: usize, settings: LedSettings) -> Self {
        let now = Instant::now();
        Self {
            pixels: vec![[0, 0, 0]; count.max(1)],
            settings,
            started: now,
            changed: now,
            last_confetti: now,
        }
    }

    /// Restore saved settings from `path`, falling back to defaults
    pub fn load(count: usize, path: Option<&str>) -> Self {
        let settings = path
            .filter(|p| Path::new(p).exists())
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default();
        Self::new(count, settings)
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub const fn settings(&self) -> &LedSettings {
        &self.settings
    }

    pub fn report(&self) -> LedReport<'_> {
        LedReport {
            settings: &self.settings,
            uptime: self.changed.elapsed().as_secs_f64(),
        }
    }

    pub fn turn_on(&mut self) {
        self.apply_solid("on", [0xff, 0xff, 0xff]);
    }

    pub fn turn_off(&mut self) {
        self.apply_solid("off", [0, 0, 0]);
    }

    fn apply_solid(&mut self, status: &str, rgb: Rgb) {
        self.pixels.fill(rgb);
        self.settings.status = status.to_string();
        self.settings.mode = Mode::Solid;
        self.settings.rgb = rgb_to_hex(rgb);
        self.changed = Instant::now();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.settings.mode = mode;
        if parse_hex(&self.settings.rgb) == Some([0, 0, 0]) {
            self.settings.rgb = rgb_to_hex(DEFAULT_RGB);
        }
    }

    /// Apply an `rgb` query value (`RRGGBB`, optionally prefixed by `#` or `%23`)
    pub fn set_color(&mut self, raw: Option<&str>) {
        match raw.map(|r| parse_hex(r.trim_start_matches("%23"))) {
            Some(Some(rgb)) => {
                self.settings.rgb = rgb_to_hex(rgb);
                self.settings.status = "set".to_string();
            }
            Some(None) => self.settings.status = "error: invalid 'rgb' param".to_string(),
            None => self.settings.status = "error: no 'rgb' param".to_string(),
        }
        self.changed = Instant::now();
    }

    /// Advance the animation by one frame
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn animate(&mut self) {
        let color = parse_hex(&self.settings.rgb).unwrap_or(DEFAULT_RGB);
        let elapsed = self.started.elapsed().as_secs_f64();
        let len = self.pixels.len();

        match self.settings.mode {
            Mode::Solid => self.pixels.fill(color),
            Mode::Rainbow => {
                let step = 255.0 / len as f64;
                let t = elapsed * 25.0;
                for (i, pixel) in self.pixels.iter_mut().enumerate() {
                    *pixel = color_wheel(((t + i as f64 * step) as u64 % 256) as u8);
                }
            }
            Mode::Cylon => {
                dim(&mut self.pixels, 5);
                let period = 2 * len;
                let mut pos = (elapsed * 10.0) as usize % period;
                if pos >= len {
                    pos = period - pos - 1;
                }
                self.pixels[pos] = color;
            }
            Mode::Confetti => {
                if self.last_confetti.elapsed().as_millis() >= 100 {
                    self.last_confetti = Instant::now();
                    dim(&mut self.pixels, 30);
                    self.pixels[fastrand::usize(..len)] = color;
                }
            }
        }
    }
}

fn dim(pixels: &mut [Rgb], amount: u8) {
    for pixel in pixels {
        for channel in pixel.iter_mut() {
            *channel = channel.saturating_sub(amount);
        }
    }
}

/// Position 0..=255 on a red-green-blue color wheel
pub const fn color_wheel(pos: u8) -> Rgb {
    match pos {
        0..=84 => [255 - pos * 3, pos * 3, 0],
        85..=169 => {
            let p = pos - 85;
            [0, 255 - p * 3, p * 3]
        }
        _ => {
            let p = pos - 170;
            [p * 3, 0, 255 - p * 3]
        }
    }
}

/// Parse `RRGGBB`, with or without a leading `#`
pub fn parse_hex(value: &str) -> Option<Rgb> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_conversions() {
        assert_eq!(parse_hex("112233"), Some([0x11, 0x22, 0x33]));
        assert_eq!(parse_hex("#FF2288"), Some([0xff, 0x22, 0x88]));
        assert_eq!(parse_hex("12345"), None);
        assert_eq!(parse_hex("zz0000"), None);
        assert_eq!(rgb_to_hex([0xcc, 0x00, 0x33]), "#cc0033");
    }

    #[test]
    fn test_set_color() {
        let mut strip = LedStrip::new(8, LedSettings::default());
        strip.set_color(Some("%23CC0033"));
        assert_eq!(strip.settings().rgb, "#cc0033");
        assert_eq!(strip.settings().status, "set");

        strip.set_color(None);
        assert_eq!(strip.settings().status, "error: no 'rgb' param");
        assert_eq!(strip.settings().rgb, "#cc0033");
    }

    #[test]
    fn test_mode_change_restores_color_when_dark() {
        let mut strip = LedStrip::new(8, LedSettings::default());
        strip.turn_off();
        assert_eq!(strip.pixels, vec![[0, 0, 0]; 8]);
        strip.set_mode(Mode::Rainbow);
        assert_eq!(strip.settings().rgb, "#ff00ff");
        assert_eq!(strip.settings().mode, Mode::Rainbow);
    }

    #[test]
    fn test_animate_every_mode() {
        let mut strip = LedStrip::new(4, LedSettings::default());
        for mode in [Mode::Solid, Mode::Rainbow, Mode::Cylon, Mode::Confetti] {
            strip.set_mode(mode);
            strip.animate();
            assert_eq!(strip.pixels.len(), 4);
        }
        strip.set_mode(Mode::Solid);
        strip.animate();
        assert!(strip.pixels.iter().all(|p| *p == DEFAULT_RGB));
    }

    #[test]
    fn test_settings_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leds.toml");
        let path = path.to_str().unwrap();

        let mut strip = LedStrip::new(8, LedSettings::default());
        strip.set_color(Some("00ff00"));
        strip.set_mode(Mode::Confetti);
        strip.save(path).unwrap();

        let restored = LedStrip::load(8, Some(path));
        assert_eq!(restored.settings(), strip.settings());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("cylon".parse::<Mode>(), Ok(Mode::Cylon));
        assert!("disco".parse::<Mode>().is_err());
        assert_eq!(Mode::Rainbow.to_string(), "rainbow");
    }
}

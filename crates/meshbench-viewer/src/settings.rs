//! Startup settings read from the environment.

use anyhow::{anyhow, bail, Context, Result};
use meshbench::config::{RenderingConfig, SubmissionStrategy, DEFAULT_TRIANGLES, MIN_TRIANGLES};
use meshbench::scheduler::DEFAULT_SAMPLE_CAPACITY;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_WINDOW_SIZE: u32 = 600;
pub const DEFAULT_REPORT: &str = "bench.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub window_width: u32,
    pub window_height: u32,
    pub triangles: u32,
    pub strategy: SubmissionStrategy,
    pub report_path: PathBuf,
    pub samples: usize,
    /// Pretend the adapter has no buffer objects, to exercise the fallback path.
    pub disable_buffer_objects: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_SIZE,
            window_height: DEFAULT_WINDOW_SIZE,
            triangles: DEFAULT_TRIANGLES,
            strategy: SubmissionStrategy::CommandList,
            report_path: PathBuf::from(DEFAULT_REPORT),
            samples: DEFAULT_SAMPLE_CAPACITY,
            disable_buffer_objects: false,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key}: cannot parse '{raw}'")),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(anyhow!("{key}: expected a boolean, got '{other}'")),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key/value source; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let window_width = parse_or(&lookup, "MESHBENCH_WINDOW_WIDTH", defaults.window_width)?;
        let window_height = parse_or(&lookup, "MESHBENCH_WINDOW_HEIGHT", defaults.window_height)?;
        if window_width == 0 || window_height == 0 {
            bail!("window size must be non-zero, got {window_width}x{window_height}");
        }

        let triangles = parse_or(&lookup, "MESHBENCH_TRIANGLES", defaults.triangles)?;
        if triangles < MIN_TRIANGLES {
            bail!("MESHBENCH_TRIANGLES must be at least {MIN_TRIANGLES}, got {triangles}");
        }

        let samples = parse_or(&lookup, "MESHBENCH_SAMPLES", defaults.samples)?;
        if samples == 0 {
            bail!("MESHBENCH_SAMPLES must be at least 1");
        }

        Ok(Self {
            window_width,
            window_height,
            triangles,
            strategy: parse_or(&lookup, "MESHBENCH_STRATEGY", defaults.strategy)?,
            report_path: lookup("MESHBENCH_REPORT")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_path),
            samples,
            disable_buffer_objects: parse_flag(&lookup, "MESHBENCH_DISABLE_BUFFER_OBJECTS")?,
        })
    }

    /// Startup configuration: default options with the configured strategy and size.
    pub fn rendering_config(&self) -> RenderingConfig {
        RenderingConfig {
            strategy: self.strategy,
            triangles: self.triangles,
            ..RenderingConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        let config = settings.rendering_config();
        assert_eq!(config, RenderingConfig::default());
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("MESHBENCH_WINDOW_WIDTH", "800"),
            ("MESHBENCH_TRIANGLES", " 10000 "),
            ("MESHBENCH_STRATEGY", "static-buffer"),
            ("MESHBENCH_REPORT", "/tmp/out.txt"),
            ("MESHBENCH_SAMPLES", "5"),
            ("MESHBENCH_DISABLE_BUFFER_OBJECTS", "true"),
        ])
        .unwrap();
        assert_eq!(settings.window_width, 800);
        assert_eq!(settings.window_height, DEFAULT_WINDOW_SIZE);
        assert_eq!(settings.triangles, 10_000);
        assert_eq!(settings.strategy, SubmissionStrategy::StaticBuffer);
        assert_eq!(settings.report_path, PathBuf::from("/tmp/out.txt"));
        assert_eq!(settings.samples, 5);
        assert!(settings.disable_buffer_objects);
    }

    #[test]
    fn test_invalid_values() {
        assert!(settings(&[("MESHBENCH_TRIANGLES", "2000")]).is_err());
        assert!(settings(&[("MESHBENCH_TRIANGLES", "lots")]).is_err());
        assert!(settings(&[("MESHBENCH_STRATEGY", "vbo")]).is_err());
        assert!(settings(&[("MESHBENCH_SAMPLES", "0")]).is_err());
        assert!(settings(&[("MESHBENCH_WINDOW_HEIGHT", "0")]).is_err());
        assert!(settings(&[("MESHBENCH_DISABLE_BUFFER_OBJECTS", "maybe")]).is_err());
    }
}

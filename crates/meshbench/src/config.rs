//! Rendering configuration: submission strategy, triangle target and option flags.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default triangle target at startup.
pub const DEFAULT_TRIANGLES: u32 = 320_000;

/// Halving the triangle target never goes below this.
pub const MIN_TRIANGLES: u32 = 2_500;

/// How the geometry reaches the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionStrategy {
    /// Per-vertex calls every frame.
    Immediate,
    /// Per-vertex calls recorded once, replayed every frame.
    CommandList,
    /// GPU-resident buffers uploaded once with a static usage hint.
    StaticBuffer,
    /// GPU-resident buffers uploaded with a dynamic usage hint.
    DynamicBuffer,
}

impl SubmissionStrategy {
    pub const ALL: [SubmissionStrategy; 4] = [
        SubmissionStrategy::Immediate,
        SubmissionStrategy::CommandList,
        SubmissionStrategy::StaticBuffer,
        SubmissionStrategy::DynamicBuffer,
    ];

    /// Human-readable name used in reports.
    pub fn label(self) -> &'static str {
        match self {
            SubmissionStrategy::Immediate => "immediate",
            SubmissionStrategy::CommandList => "command list",
            SubmissionStrategy::StaticBuffer => "static buffer",
            SubmissionStrategy::DynamicBuffer => "dynamic buffer",
        }
    }

    /// Whether the strategy needs buffer-object support.
    pub fn uses_buffer_objects(self) -> bool {
        matches!(
            self,
            SubmissionStrategy::StaticBuffer | SubmissionStrategy::DynamicBuffer
        )
    }
}

impl fmt::Display for SubmissionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown submission strategy '{0}' (expected immediate, command-list, static-buffer or dynamic-buffer)")]
pub struct UnknownStrategy(pub String);

impl FromStr for SubmissionStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "immediate" => Ok(SubmissionStrategy::Immediate),
            "command-list" => Ok(SubmissionStrategy::CommandList),
            "static-buffer" => Ok(SubmissionStrategy::StaticBuffer),
            "dynamic-buffer" => Ok(SubmissionStrategy::DynamicBuffer),
            _ => Err(UnknownStrategy(s.to_owned())),
        }
    }
}

/// Names one of the six rendering option flags. The discriminant is its bit
/// position in [`RenderingOptions::mask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionFlag {
    TriangleStrip = 0,
    Color = 1,
    Texture = 2,
    SmoothShading = 3,
    BackFacePainting = 4,
    Wireframe = 5,
}

impl OptionFlag {
    pub const ALL: [OptionFlag; 6] = [
        OptionFlag::TriangleStrip,
        OptionFlag::Color,
        OptionFlag::Texture,
        OptionFlag::SmoothShading,
        OptionFlag::BackFacePainting,
        OptionFlag::Wireframe,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            OptionFlag::TriangleStrip => "triangle strip",
            OptionFlag::Color => "color",
            OptionFlag::Texture => "texture",
            OptionFlag::SmoothShading => "smooth shading",
            OptionFlag::BackFacePainting => "back-face painting",
            OptionFlag::Wireframe => "wireframe",
        }
    }
}

/// Independent rendering switches; every combination is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderingOptions {
    pub triangle_strip: bool,
    pub color: bool,
    pub texture: bool,
    pub smooth_shading: bool,
    pub back_face_painting: bool,
    pub wireframe: bool,
}

impl RenderingOptions {
    /// Number of distinct option sets.
    pub const COMBINATIONS: u8 = 1 << OptionFlag::ALL.len();

    pub fn get(&self, flag: OptionFlag) -> bool {
        match flag {
            OptionFlag::TriangleStrip => self.triangle_strip,
            OptionFlag::Color => self.color,
            OptionFlag::Texture => self.texture,
            OptionFlag::SmoothShading => self.smooth_shading,
            OptionFlag::BackFacePainting => self.back_face_painting,
            OptionFlag::Wireframe => self.wireframe,
        }
    }

    pub fn set(&mut self, flag: OptionFlag, value: bool) {
        let slot = match flag {
            OptionFlag::TriangleStrip => &mut self.triangle_strip,
            OptionFlag::Color => &mut self.color,
            OptionFlag::Texture => &mut self.texture,
            OptionFlag::SmoothShading => &mut self.smooth_shading,
            OptionFlag::BackFacePainting => &mut self.back_face_painting,
            OptionFlag::Wireframe => &mut self.wireframe,
        };
        *slot = value;
    }

    pub fn toggle(&mut self, flag: OptionFlag) {
        self.set(flag, !self.get(flag));
    }

    /// Decodes a 6-bit mask; bits above the sixth are ignored.
    pub fn from_mask(mask: u8) -> Self {
        let mut options = Self::default();
        for flag in OptionFlag::ALL {
            options.set(flag, mask & flag.bit() != 0);
        }
        options
    }

    pub fn mask(&self) -> u8 {
        OptionFlag::ALL
            .iter()
            .filter(|flag| self.get(**flag))
            .fold(0, |mask, flag| mask | flag.bit())
    }
}

/// Immutable snapshot consumed by geometry generation and provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderingConfig {
    pub strategy: SubmissionStrategy,
    pub triangles: u32,
    pub options: RenderingOptions,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            strategy: SubmissionStrategy::CommandList,
            triangles: DEFAULT_TRIANGLES,
            options: RenderingOptions {
                triangle_strip: true,
                color: true,
                texture: false,
                smooth_shading: true,
                back_face_painting: true,
                wireframe: false,
            },
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Multi-line description used on the console and in sweep reports.
impl fmt::Display for RenderingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+--------------------------------------------------+")?;
        writeln!(f, " - {:.<24} {}", "strategy ", self.strategy)?;
        for flag in OptionFlag::ALL {
            writeln!(
                f,
                " - {:.<24} {}",
                format!("{} ", flag.label()),
                on_off(self.options.get(flag))
            )?;
        }
        Ok(())
    }
}

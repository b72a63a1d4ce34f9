//! Command line flags and scene constants
//!
//! Every number that shapes the scene lives in [`SceneConfig`]; its `Default`
//! reproduces the reference scene and [`SceneConfig::from_cli`] overlays the
//! few values that can be changed from the command line.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Interactive Earth, Moon and Sun viewer
#[derive(Parser, Debug, Clone)]
#[command(name = "earthview", version, about)]
pub struct Cli {
    /// Directory holding `textures/` and `models/`
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// Number of stars in the background field
    #[arg(long, default_value_t = 1000)]
    pub stars: u32,

    /// Seed for the starfield (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Synchronise presentation with the display refresh rate
    #[arg(long)]
    pub vsync: bool,

    /// Hide the info overlay
    #[arg(long)]
    pub no_ui: bool,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 800)]
    pub height: u32,
}

/// Location of every file the scene loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub earth_day: PathBuf,
    pub earth_night: PathBuf,
    pub earth_bump: PathBuf,
    pub earth_clouds: PathBuf,
    pub sun: PathBuf,
    pub satellite: PathBuf,
}

impl AssetPaths {
    pub fn from_root(root: &Path) -> Self {
        let textures = root.join("textures");
        Self {
            earth_day: textures.join("earth_day.jpg"),
            earth_night: textures.join("earth_night.jpg"),
            earth_bump: textures.join("earth_bump.jpg"),
            earth_clouds: textures.join("earth_clouds.jpg"),
            sun: textures.join("sun.jpg"),
            satellite: root.join("models").join("Satellite.obj"),
        }
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::from_root(Path::new("assets"))
    }
}

/// Sphere dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereConfig {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

/// Per-tick angular speeds in radians, one tick being one 60 Hz frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    pub earth_spin: f32,
    pub cloud_spin: f32,
    pub moon_orbit_speed: f32,
    pub moon_orbit_radius: f32,
    pub satellite_orbit_speed: f32,
    pub satellite_orbit_radius: f32,
    /// Amplitude of the satellite's vertical bob
    pub satellite_bob: f32,
    pub satellite_spin: f32,
    pub tick_rate: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            earth_spin: 0.001,
            cloud_spin: 0.0012,
            moon_orbit_speed: 0.002,
            moon_orbit_radius: 3.0,
            satellite_orbit_speed: 0.005,
            satellite_orbit_radius: 4.0,
            satellite_bob: 1.0,
            satellite_spin: 0.01,
            tick_rate: 60.0,
        }
    }
}

/// Light rig of the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingConfig {
    pub ambient_color: [f32; 3],
    pub directional_color: [f32; 3],
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
    pub sunlight_color: [f32; 3],
    pub sunlight_intensity: f32,
    pub sunlight_range: f32,
    pub sunlight_decay: f32,
    /// Radius around the Earth covered by the sun's shadow map
    pub shadow_radius: f32,
    pub shadow_map_size: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: hex_color(0x111111),
            directional_color: hex_color(0xffffff),
            directional_intensity: 1.0,
            directional_position: [5.0, 3.0, 5.0],
            sunlight_color: hex_color(0xffee88),
            sunlight_intensity: 3.0,
            sunlight_range: 1000.0,
            sunlight_decay: 2.0,
            shadow_radius: 3.5,
            shadow_map_size: 2048,
        }
    }
}

/// Camera start state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub distance: f32,
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            distance: 5.0,
            damping: 0.05,
        }
    }
}

/// Starfield parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarfieldConfig {
    pub count: u32,
    /// Edge length of the cube the stars are scattered in
    pub spread: f32,
    pub size: f32,
    pub seed: Option<u64>,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            spread: 200.0,
            size: 0.5,
            seed: None,
        }
    }
}

/// Everything needed to build and animate the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub assets: AssetPaths,
    pub earth: SphereConfig,
    pub clouds: SphereConfig,
    pub sun: SphereConfig,
    pub moon: SphereConfig,
    pub sun_position: [f32; 3],
    pub satellite_scale: f32,
    pub earth_bump_scale: f32,
    pub earth_specular: [f32; 3],
    pub earth_shininess: f32,
    pub earth_emissive_intensity: f32,
    pub cloud_opacity: f32,
    pub sun_emissive: [f32; 3],
    pub sun_emissive_intensity: f32,
    pub moon_color: [f32; 3],
    pub hover_color: [f32; 3],
    pub motion: MotionConfig,
    pub lighting: LightingConfig,
    pub camera: CameraConfig,
    pub starfield: StarfieldConfig,
    pub vsync: bool,
    pub show_ui: bool,
    pub window_size: (u32, u32),
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            earth: SphereConfig {
                radius: 2.0,
                width_segments: 64,
                height_segments: 64,
            },
            clouds: SphereConfig {
                radius: 2.02,
                width_segments: 64,
                height_segments: 64,
            },
            sun: SphereConfig {
                radius: 0.5,
                width_segments: 32,
                height_segments: 32,
            },
            moon: SphereConfig {
                radius: 0.27,
                width_segments: 32,
                height_segments: 32,
            },
            sun_position: [8.0, 0.0, 0.0],
            satellite_scale: 0.03,
            earth_bump_scale: 0.05,
            earth_specular: hex_color(0x808080),
            earth_shininess: 5.0,
            earth_emissive_intensity: 1.5,
            cloud_opacity: 0.4,
            sun_emissive: hex_color(0xffaa33),
            sun_emissive_intensity: 1.5,
            moon_color: hex_color(0xaaaaaa),
            hover_color: hex_color(0xff0000),
            motion: MotionConfig::default(),
            lighting: LightingConfig::default(),
            camera: CameraConfig::default(),
            starfield: StarfieldConfig::default(),
            vsync: false,
            show_ui: true,
            window_size: (1200, 800),
        }
    }
}

impl SceneConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            assets: AssetPaths::from_root(&cli.assets),
            starfield: StarfieldConfig {
                count: cli.stars,
                seed: cli.seed,
                ..defaults.starfield
            },
            vsync: cli.vsync,
            show_ui: !cli.no_ui,
            window_size: (cli.width.max(1), cli.height.max(1)),
            ..defaults
        }
    }
}

/// Converts a 0xRRGGBB colour into linear RGB floats
///
/// Scene colours are authored in sRGB, shading happens in linear space.
pub fn hex_color(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_reference_scene() {
        let cli = Cli::try_parse_from(["earthview"]).unwrap();
        let config = SceneConfig::from_cli(&cli);

        assert_eq!(config.starfield.count, 1000);
        assert_eq!(config.starfield.seed, None);
        assert!(config.show_ui);
        assert!(!config.vsync);
        assert_eq!(config.assets, AssetPaths::default());
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn cli_overrides_are_applied() {
        let cli = Cli::try_parse_from([
            "earthview", "--assets", "/data/space", "--stars", "50", "--seed", "7", "--vsync",
            "--no-ui",
        ])
        .unwrap();
        let config = SceneConfig::from_cli(&cli);

        assert_eq!(config.starfield.count, 50);
        assert_eq!(config.starfield.seed, Some(7));
        assert!(config.vsync);
        assert!(!config.show_ui);
        assert_eq!(
            config.assets.satellite,
            Path::new("/data/space").join("models").join("Satellite.obj")
        );
        assert_eq!(
            config.assets.earth_day,
            Path::new("/data/space").join("textures").join("earth_day.jpg")
        );
    }

    #[test]
    fn hex_colors_are_linearised() {
        assert_eq!(hex_color(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(hex_color(0x000000), [0.0, 0.0, 0.0]);

        let red = hex_color(0xff0000);
        assert_eq!(red, [1.0, 0.0, 0.0]);

        // 0xaa is ~0.667 in sRGB, ~0.402 linear
        let grey = hex_color(0xaaaaaa);
        assert!((grey[0] - 0.402).abs() < 0.01);
    }

    #[test]
    fn motion_defaults_match_reference_increments() {
        let motion = MotionConfig::default();
        assert_eq!(motion.earth_spin, 0.001);
        assert_eq!(motion.cloud_spin, 0.0012);
        assert_eq!(motion.moon_orbit_speed, 0.002);
        assert_eq!(motion.satellite_orbit_speed, 0.005);
        assert_eq!(motion.satellite_spin, 0.01);
    }
}

//! Lumen - OpenGL context negotiation probe
//!
//! Opens an X11 display, negotiates a GLX context against the requested
//! depth/stencil/antialiasing settings and reports what the driver granted.

mod config;
mod probe;
mod windowed;

use anyhow::{Context, Result};
use clap::Parser;
use config::{LumenConfig, SurfaceMode};
use lumen_core::GlDisplay;
use lumen_platform_x11::XlibPlatform;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Probe OpenGL context negotiation on an X11 display
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Probe OpenGL context negotiation on an X11 display")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to ./lumen.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// X11 display name (defaults to $DISPLAY)
    #[arg(short, long)]
    display: Option<String>,

    /// Render into a window instead of a hidden surface
    #[arg(short, long)]
    windowed: bool,

    /// Requested depth buffer bits
    #[arg(long)]
    depth: Option<u32>,

    /// Requested stencil buffer bits
    #[arg(long)]
    stencil: Option<u32>,

    /// Requested antialiasing level
    #[arg(long)]
    antialiasing: Option<u32>,

    /// Requested bits per pixel
    #[arg(long)]
    bits_per_pixel: Option<u32>,

    /// Disable vertical sync
    #[arg(long)]
    no_vsync: bool,

    /// Number of frames to present
    #[arg(long)]
    frames: Option<u32>,

    /// Also create a context sharing objects with the probed one
    #[arg(long)]
    share: bool,
}

impl Args {
    /// Command-line flags take precedence over the configuration file
    fn apply(&self, config: &mut LumenConfig) {
        if self.windowed {
            config.surface.mode = SurfaceMode::Windowed;
        }
        if let Some(depth) = self.depth {
            config.context.depth_bits = depth;
        }
        if let Some(stencil) = self.stencil {
            config.context.stencil_bits = stencil;
        }
        if let Some(level) = self.antialiasing {
            config.context.antialiasing_level = level;
        }
        if let Some(bits) = self.bits_per_pixel {
            config.surface.bits_per_pixel = Some(bits);
        }
        if self.no_vsync {
            config.surface.vertical_sync = false;
        }
        if let Some(frames) = self.frames {
            config.surface.frames = frames;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = LumenConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    let platform =
        XlibPlatform::open(args.display.as_deref()).context("Failed to open X11 display")?;
    tracing::info!("Using display {}", platform.name());
    let display = GlDisplay::new(Arc::new(platform));

    let report = match config.surface.mode {
        SurfaceMode::Offscreen => probe::run(&display, None, &config, args.share)?,
        SurfaceMode::Windowed => windowed::run(&display, &config, args.share)?,
    };

    if report.achieved != report.requested {
        tracing::info!("Driver granted different settings than requested");
    }
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "lumen",
            "--windowed",
            "--antialiasing",
            "8",
            "--no-vsync",
            "--frames",
            "1",
        ]);
        let mut config =
            LumenConfig::from_toml("[context]\ndepth_bits = 16\nantialiasing_level = 2").unwrap();
        args.apply(&mut config);

        assert_eq!(config.surface.mode, SurfaceMode::Windowed);
        assert_eq!(config.context.depth_bits, 16);
        assert_eq!(config.context.antialiasing_level, 8);
        assert!(!config.surface.vertical_sync);
        assert_eq!(config.surface.frames, 1);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["lumen"]);
        let mut config = LumenConfig::default();
        args.apply(&mut config);
        assert_eq!(config, LumenConfig::default());
    }
}

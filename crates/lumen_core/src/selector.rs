//! Pixel format selection
//!
//! Picks the driver format closest to the requested [`ContextSettings`] for a
//! given surface:
//!
//! 1. Keep only formats whose visual depth and id match the surface exactly.
//! 2. Drop formats without RGBA rendering or double buffering, and, when
//!    antialiasing is requested, formats with fewer samples than requested.
//! 3. Score what is left by weighted deviation from the request and keep the
//!    lowest score (first enumerated wins ties).
//! 4. If nothing is eligible, lower the antialiasing level (`n -> 2 -> 0`)
//!    and try again.
//!
//! [`select_format`] is a pure function over an already enumerated candidate
//! list; [`VisualSelector`] adds the platform query and logging.

use crate::error::{ContextError, Result};
use crate::settings::ContextSettings;
use lumen_platform::{CandidateFormat, GlPlatform, SurfaceFormat};
use smallvec::SmallVec;

/// Score weight per bit of colour deviation
pub const COLOR_WEIGHT: u32 = 1;
/// Score weight per bit of stencil deviation
pub const STENCIL_WEIGHT: u32 = 4;
/// Score weight per bit of depth deviation
pub const DEPTH_WEIGHT: u32 = 16;
/// Score weight per sample of antialiasing deviation
pub const ANTIALIASING_WEIGHT: u32 = 64;

/// Antialiasing levels visited by the fallback ladder
pub type LadderSteps = SmallVec<[u32; 3]>;

/// Outcome of a successful format selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// The chosen format
    pub format: CandidateFormat,
    /// Requested settings with depth/stencil taken from `format` and the
    /// antialiasing level that succeeded
    pub settings: ContextSettings,
    /// Antialiasing levels tried, in order; the last one succeeded
    pub attempted: LadderSteps,
}

impl Selection {
    /// Whether the antialiasing level had to be lowered
    pub fn is_degraded(&self) -> bool {
        self.attempted.len() > 1
    }
}

/// Next rung of the antialiasing ladder, `None` once antialiasing is off
pub fn next_antialiasing_level(level: u32) -> Option<u32> {
    if level > 2 {
        Some(2)
    } else if level > 0 {
        Some(0)
    } else {
        None
    }
}

/// Weighted deviation of `format` from the request; zero is an exact match
pub fn score(format: &CandidateFormat, bits_per_pixel: u32, settings: &ContextSettings) -> u32 {
    let color = bits_per_pixel.abs_diff(format.color_bits);
    let depth = settings.depth_bits.abs_diff(format.depth_bits);
    let stencil = settings.stencil_bits.abs_diff(format.stencil_bits);
    let antialiasing = settings
        .antialiasing_level
        .abs_diff(format.effective_samples());

    color
        .saturating_mul(COLOR_WEIGHT)
        .saturating_add(depth.saturating_mul(DEPTH_WEIGHT))
        .saturating_add(stencil.saturating_mul(STENCIL_WEIGHT))
        .saturating_add(antialiasing.saturating_mul(ANTIALIASING_WEIGHT))
}

/// Whether `format` may be chosen at the given antialiasing level
pub fn is_eligible(format: &CandidateFormat, antialiasing_level: u32) -> bool {
    format.rgba
        && format.double_buffered
        && (antialiasing_level == 0 || format.effective_samples() >= antialiasing_level)
}

fn best_candidate<'a>(
    candidates: &[&'a CandidateFormat],
    bits_per_pixel: u32,
    settings: &ContextSettings,
) -> Option<&'a CandidateFormat> {
    candidates
        .iter()
        .copied()
        .filter(|format| is_eligible(format, settings.antialiasing_level))
        // min_by_key keeps the first of equal minima
        .min_by_key(|format| score(format, bits_per_pixel, settings))
}

/// Choose the best format for `surface` out of `candidates`
pub fn select_format(
    candidates: &[CandidateFormat],
    surface: &SurfaceFormat,
    bits_per_pixel: u32,
    desired: ContextSettings,
) -> Result<Selection> {
    let matching: Vec<&CandidateFormat> = candidates
        .iter()
        .filter(|format| format.matches_surface(surface))
        .collect();

    if matching.is_empty() {
        return Err(ContextError::Enumeration(format!(
            "no pixel format for surface depth {} / visual {:#x}",
            surface.depth, surface.format_id
        )));
    }

    let mut settings = desired;
    let mut attempted = LadderSteps::new();

    loop {
        attempted.push(settings.antialiasing_level);

        if let Some(format) = best_candidate(&matching, bits_per_pixel, &settings) {
            settings.depth_bits = format.depth_bits;
            settings.stencil_bits = format.stencil_bits;
            return Ok(Selection {
                format: *format,
                settings,
                attempted,
            });
        }

        match next_antialiasing_level(settings.antialiasing_level) {
            Some(level) => settings.antialiasing_level = level,
            None => {
                return Err(ContextError::NoSuitableFormat {
                    attempted: attempted.into_vec(),
                })
            }
        }
    }
}

/// Format selection against a live platform
pub struct VisualSelector<'a> {
    platform: &'a dyn GlPlatform,
}

impl<'a> VisualSelector<'a> {
    /// Create a selector querying `platform`
    pub fn new(platform: &'a dyn GlPlatform) -> Self {
        Self { platform }
    }

    /// Enumerate the formats for `surface` and pick the best one
    pub fn select(
        &self,
        surface: &SurfaceFormat,
        bits_per_pixel: u32,
        desired: ContextSettings,
    ) -> Result<Selection> {
        let candidates = self
            .platform
            .enumerate_formats(surface)
            .map_err(|err| ContextError::Enumeration(err.to_string()))?;

        let selection = select_format(&candidates, surface, bits_per_pixel, desired)?;

        for step in selection.attempted.windows(2) {
            if step[1] > 0 {
                tracing::warn!(
                    "Failed to find a pixel format supporting {} antialiasing levels; \
                     trying with {} levels",
                    step[0],
                    step[1]
                );
            } else {
                tracing::warn!(
                    "Failed to find a pixel format supporting antialiasing; \
                     antialiasing will be disabled"
                );
            }
        }

        tracing::debug!(
            format_id = selection.format.format_id,
            color_bits = selection.format.color_bits,
            depth_bits = selection.settings.depth_bits,
            stencil_bits = selection.settings.stencil_bits,
            antialiasing = selection.settings.antialiasing_level,
            "Selected pixel format"
        );

        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: SurfaceFormat = SurfaceFormat::new(24, 0x21);

    fn format(color: u32, depth: u32, stencil: u32, samples: u32) -> CandidateFormat {
        CandidateFormat {
            format_id: SURFACE.format_id,
            visual_depth: SURFACE.depth,
            color_bits: color,
            depth_bits: depth,
            stencil_bits: stencil,
            has_antialiasing: samples > 0,
            sample_count: samples,
            rgba: true,
            double_buffered: true,
        }
    }

    #[test]
    fn test_exact_match_scores_zero() {
        let settings = ContextSettings::new(24, 8, 4);
        assert_eq!(score(&format(32, 24, 8, 4), 32, &settings), 0);
    }

    #[test]
    fn test_larger_deviation_scores_worse() {
        let settings = ContextSettings::new(24, 8, 0);
        let close = score(&format(32, 16, 8, 0), 32, &settings);
        let far = score(&format(32, 0, 8, 0), 32, &settings);
        assert!(close > 0);
        assert!(far > close);
    }

    #[test]
    fn test_antialiasing_weighs_most_and_color_least() {
        let settings = ContextSettings::new(24, 8, 4);
        let one = |color, depth, stencil, samples| {
            score(&format(color, depth, stencil, samples), 32, &settings)
        };

        let color_off = one(31, 24, 8, 4);
        let stencil_off = one(32, 24, 7, 4);
        let depth_off = one(32, 23, 8, 4);
        let samples_off = one(32, 24, 8, 5);

        assert!(color_off < stencil_off);
        assert!(stencil_off < depth_off);
        assert!(depth_off < samples_off);
    }

    #[test]
    fn test_exact_match_wins() {
        let candidates = [
            format(32, 16, 0, 0),
            format(32, 24, 8, 0),
            format(24, 24, 8, 0),
        ];
        let selection =
            select_format(&candidates, &SURFACE, 32, ContextSettings::new(24, 8, 0)).unwrap();
        assert_eq!(selection.format, candidates[1]);
        assert!(!selection.is_degraded());
    }

    #[test]
    fn test_ties_keep_first_enumerated() {
        let first = format(32, 16, 8, 0);
        let second = format(32, 32, 8, 0);
        let selection =
            select_format(&[first, second], &SURFACE, 32, ContextSettings::new(24, 8, 0)).unwrap();
        assert_eq!(selection.format, first);
    }

    #[test]
    fn test_mandatory_capabilities_filter() {
        let mut single_buffered = format(32, 24, 8, 0);
        single_buffered.double_buffered = false;
        let mut color_index = format(32, 24, 8, 0);
        color_index.rgba = false;
        let fallback = format(16, 16, 0, 0);

        let selection = select_format(
            &[single_buffered, color_index, fallback],
            &SURFACE,
            32,
            ContextSettings::new(24, 8, 0),
        )
        .unwrap();
        assert_eq!(selection.format, fallback);
    }

    #[test]
    fn test_surface_mismatch_is_never_considered() {
        let mut other_visual = format(32, 24, 8, 0);
        other_visual.format_id = 0x99;
        let mut other_depth = format(32, 24, 8, 0);
        other_depth.visual_depth = 32;
        let fallback = format(16, 16, 0, 0);

        let selection = select_format(
            &[other_visual, other_depth, fallback],
            &SURFACE,
            32,
            ContextSettings::new(24, 8, 0),
        )
        .unwrap();
        assert_eq!(selection.format, fallback);
    }

    #[test]
    fn test_no_matching_surface_is_enumeration_error() {
        let mut other_visual = format(32, 24, 8, 0);
        other_visual.format_id = 0x99;

        let err =
            select_format(&[other_visual], &SURFACE, 32, ContextSettings::default()).unwrap_err();
        assert!(matches!(err, ContextError::Enumeration(_)));

        let err = select_format(&[], &SURFACE, 32, ContextSettings::default()).unwrap_err();
        assert!(matches!(err, ContextError::Enumeration(_)));
    }

    #[test]
    fn test_settings_take_chosen_depth_and_stencil() {
        let candidates = [format(32, 16, 1, 0)];
        let selection =
            select_format(&candidates, &SURFACE, 32, ContextSettings::new(32, 8, 0)).unwrap();
        assert_eq!(selection.settings, ContextSettings::new(16, 1, 0));
    }

    #[test]
    fn test_ladder_sequence() {
        assert_eq!(next_antialiasing_level(8), Some(2));
        assert_eq!(next_antialiasing_level(3), Some(2));
        assert_eq!(next_antialiasing_level(2), Some(0));
        assert_eq!(next_antialiasing_level(1), Some(0));
        assert_eq!(next_antialiasing_level(0), None);
    }

    #[test]
    fn test_ladder_stops_at_two() {
        let candidates = [format(32, 24, 8, 0), format(32, 24, 8, 2)];
        let selection =
            select_format(&candidates, &SURFACE, 32, ContextSettings::new(24, 8, 8)).unwrap();
        assert_eq!(selection.attempted.as_slice(), &[8, 2]);
        assert_eq!(selection.settings.antialiasing_level, 2);
        assert_eq!(selection.format, candidates[1]);
        assert!(selection.is_degraded());
    }

    #[test]
    fn test_ladder_skips_two_for_low_requests() {
        let candidates = [format(32, 24, 8, 0)];
        let selection =
            select_format(&candidates, &SURFACE, 32, ContextSettings::new(24, 8, 2)).unwrap();
        assert_eq!(selection.attempted.as_slice(), &[2, 0]);
        assert_eq!(selection.settings.antialiasing_level, 0);
    }

    #[test]
    fn test_ladder_exhaustion() {
        let mut unusable = format(32, 24, 8, 8);
        unusable.double_buffered = false;

        let err =
            select_format(&[unusable], &SURFACE, 32, ContextSettings::new(24, 8, 16)).unwrap_err();
        assert_eq!(
            err,
            ContextError::NoSuitableFormat {
                attempted: vec![16, 2, 0]
            }
        );

        let err =
            select_format(&[unusable], &SURFACE, 32, ContextSettings::new(24, 8, 0)).unwrap_err();
        assert_eq!(err, ContextError::NoSuitableFormat { attempted: vec![0] });
    }

    #[test]
    fn test_samples_without_sample_buffers_do_not_count() {
        // 24/8 without multisampling, and a 16/0 format reporting 4 samples but
        // no sample buffers: nothing offers 4x, so the ladder drops to 0.
        let mut no_buffers = format(32, 16, 0, 0);
        no_buffers.sample_count = 4;
        let candidates = [format(32, 24, 8, 0), no_buffers];

        let selection =
            select_format(&candidates, &SURFACE, 32, ContextSettings::new(24, 8, 4)).unwrap();
        assert_eq!(selection.attempted.as_slice(), &[4, 2, 0]);
        assert_eq!(selection.settings, ContextSettings::new(24, 8, 0));
        assert_eq!(selection.format, candidates[0]);
    }

    #[test]
    fn test_closest_sample_count_is_preferred() {
        let candidates = [format(32, 24, 8, 16), format(32, 24, 8, 4), format(32, 24, 8, 8)];
        let selection =
            select_format(&candidates, &SURFACE, 32, ContextSettings::new(24, 8, 4)).unwrap();
        assert_eq!(selection.format, candidates[1]);
    }
}

// Data-driven canvas configuration.
//
// Every tunable the canvas reads lives in `CanvasConfig`: tile counts and
// geometry bounds, interaction delays, transition timings, edge-exit
// thresholds, overlay limits, and siren durations. Controllers never embed
// magic numbers; they read from the config they were constructed with. The
// defaults reproduce the shipped channel's behavior exactly.
//
// Parameters are grouped into nested structs (`TileLayoutParams`,
// `TransitionParams`, `EdgeExitParams`, `OverlayParams`, `AudioParams`) so a
// JSON config can override one group without restating the others.
//
// See also: `canvas.rs` which owns the config as part of `CanvasState`,
// `transition.rs` for the timings and thresholds in use, `overlay.rs` for
// the limits and the safe band.
//
// **Critical constraint: determinism.** Config values feed directly into
// timer deadlines and random draws. Same config + same seed + same inputs
// must give the same event stream.

use crate::error::{ChannelError, ChannelResult};
use serde::{Deserialize, Serialize};

/// Where tiles may be placed and how big they are, in canvas percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayoutParams {
    /// Number of tiles generated at mount.
    pub tile_count: usize,
    /// Half-open range for the top-left `x` and `y`.
    pub position_range: (f64, f64),
    /// Half-open range for `width` and `height`.
    pub size_range: (f64, f64),
}

impl Default for TileLayoutParams {
    fn default() -> Self {
        Self {
            tile_count: 30,
            position_range: (10.0, 90.0),
            size_range: (8.0, 23.0),
        }
    }
}

/// Durations of the timed cinematic phases, in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionParams {
    pub dolly_out_ms: u64,
    pub zoom_in_ms: u64,
    /// Length of the organic exit, from entering `OrganicExit` to `Idle`.
    pub organic_exit_ms: u64,
    /// Interval between exit-progress ramp ticks.
    pub exit_tick_ms: u64,
    /// Progress added per ramp tick.
    pub exit_progress_step: f64,
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            dolly_out_ms: 900,
            zoom_in_ms: 900,
            organic_exit_ms: 1200,
            exit_tick_ms: 50,
            exit_progress_step: 0.05,
        }
    }
}

/// Edge-proximity auto-exit while immersed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeExitParams {
    /// Distance from the nearest viewport edge, in px, at which proximity
    /// starts rising above zero.
    pub threshold_px: f64,
    /// Proximity strictly above this arms the delayed check; at or below it
    /// cancels an armed check.
    pub arm_proximity: f64,
    /// Proximity strictly above this at check time triggers the exit.
    pub exit_proximity: f64,
    /// Delay between arming and checking.
    pub confirm_delay_ms: u64,
}

impl Default for EdgeExitParams {
    fn default() -> Self {
        Self {
            threshold_px: 100.0,
            arm_proximity: 0.3,
            exit_proximity: 0.5,
            confirm_delay_ms: 800,
        }
    }
}

/// Limits and placement for derived overlays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    /// Delay after mount before any overlay may appear.
    pub reveal_delay_ms: u64,
    pub max_resonance_connections: usize,
    /// Bubbles shown when a frequency filter is active.
    pub max_filtered_comments: usize,
    /// Bubbles shown for a plain hover.
    pub max_hover_comments: usize,
    /// Filtered comments need an `ai_score` strictly above this.
    pub comment_quality_threshold: f32,
    pub max_story_connections: usize,
    /// Closed band, in canvas percent, every bubble and story-thread endpoint
    /// is clamped into on both axes.
    pub safe_band: (f64, f64),
    /// Base radius of the bubble ring around canvas center, plus up to
    /// `bubble_radius_jitter` extra.
    pub bubble_radius: f64,
    pub bubble_radius_jitter: f64,
    /// Angular spacing between bubbles, plus up to `bubble_angle_jitter_deg`.
    pub bubble_angle_step_deg: f64,
    pub bubble_angle_jitter_deg: f64,
    /// Half-open range the far end of a story thread is drawn from, before
    /// clamping into `safe_band`.
    pub thread_end_range: (f64, f64),
    /// Story preview length used in thread labels.
    pub story_preview_chars: usize,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            reveal_delay_ms: 2000,
            max_resonance_connections: 2,
            max_filtered_comments: 2,
            max_hover_comments: 1,
            comment_quality_threshold: 0.85,
            max_story_connections: 2,
            safe_band: (15.0, 85.0),
            bubble_radius: 25.0,
            bubble_radius_jitter: 15.0,
            bubble_angle_step_deg: 120.0,
            bubble_angle_jitter_deg: 60.0,
            thread_end_range: (10.0, 90.0),
            story_preview_chars: 100,
        }
    }
}

/// Siren lifetimes. Synthesis parameters belong to the audio collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    pub shelter_siren_ms: u64,
    pub memorial_siren_ms: u64,
    /// Fade-out appended to either siren before it is stopped.
    pub siren_fade_ms: u64,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            shelter_siren_ms: 20_000,
            memorial_siren_ms: 60_000,
            siren_fade_ms: 2_000,
        }
    }
}

/// Top-level canvas configuration. Loaded once, never mutated at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub tiles: TileLayoutParams,
    /// Hover dwell before the proactive nudge fires.
    pub hover_nudge_delay_ms: u64,
    /// Interaction lock after a frequency-filter change.
    pub recalibration_window_ms: u64,
    pub transition: TransitionParams,
    pub edge_exit: EdgeExitParams,
    pub overlays: OverlayParams,
    pub audio: AudioParams,
    /// Initial viewport size in px, until a `Resize` input arrives.
    pub viewport: (f64, f64),
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            tiles: TileLayoutParams::default(),
            hover_nudge_delay_ms: 5000,
            recalibration_window_ms: 1500,
            transition: TransitionParams::default(),
            edge_exit: EdgeExitParams::default(),
            overlays: OverlayParams::default(),
            audio: AudioParams::default(),
            viewport: (1280.0, 800.0),
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a config. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> ChannelResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the controllers cannot run with.
    pub fn validate(&self) -> ChannelResult<()> {
        if self.tiles.tile_count == 0 {
            return Err(invalid("tiles.tile_count", "must be at least 1"));
        }
        check_range("tiles.position_range", self.tiles.position_range)?;
        check_range("tiles.size_range", self.tiles.size_range)?;
        check_range("overlays.safe_band", self.overlays.safe_band)?;
        check_range("overlays.thread_end_range", self.overlays.thread_end_range)?;

        let durations = [
            ("hover_nudge_delay_ms", self.hover_nudge_delay_ms),
            ("recalibration_window_ms", self.recalibration_window_ms),
            ("transition.dolly_out_ms", self.transition.dolly_out_ms),
            ("transition.zoom_in_ms", self.transition.zoom_in_ms),
            ("transition.organic_exit_ms", self.transition.organic_exit_ms),
            ("transition.exit_tick_ms", self.transition.exit_tick_ms),
            ("edge_exit.confirm_delay_ms", self.edge_exit.confirm_delay_ms),
        ];
        for (field, ms) in durations {
            if ms == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        let step = self.transition.exit_progress_step;
        if !(step > 0.0 && step <= 1.0) {
            return Err(invalid(
                "transition.exit_progress_step",
                format!("must be in (0, 1], got {step}"),
            ));
        }

        let edge = &self.edge_exit;
        if !(edge.threshold_px > 0.0) {
            return Err(invalid("edge_exit.threshold_px", "must be positive"));
        }
        if !(0.0 <= edge.arm_proximity
            && edge.arm_proximity < edge.exit_proximity
            && edge.exit_proximity < 1.0)
        {
            return Err(invalid(
                "edge_exit.exit_proximity",
                format!(
                    "need 0 <= arm ({}) < exit ({}) < 1",
                    edge.arm_proximity, edge.exit_proximity
                ),
            ));
        }

        let (w, h) = self.viewport;
        if !(w > 0.0 && h > 0.0) {
            return Err(invalid("viewport", "width and height must be positive"));
        }
        Ok(())
    }

    /// Siren lifetime including its fade.
    pub fn siren_total_ms(&self, kind: crate::types::SirenKind) -> u64 {
        let base = match kind {
            crate::types::SirenKind::Shelter => self.audio.shelter_siren_ms,
            crate::types::SirenKind::Memorial => self.audio.memorial_siren_ms,
        };
        base + self.audio.siren_fade_ms
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ChannelError {
    ChannelError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

fn check_range(field: &'static str, (low, high): (f64, f64)) -> ChannelResult<()> {
    if low.is_finite() && high.is_finite() && low < high {
        Ok(())
    } else {
        Err(invalid(field, format!("need low < high, got ({low}, {high})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SirenKind;

    #[test]
    fn default_config_is_valid() {
        CanvasConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = CanvasConfig::from_json("{}").unwrap();
        assert_eq!(config, CanvasConfig::default());
    }

    #[test]
    fn partial_group_override_keeps_sibling_defaults() {
        let config =
            CanvasConfig::from_json(r#"{"transition": {"dolly_out_ms": 300}}"#).unwrap();
        assert_eq!(config.transition.dolly_out_ms, 300);
        assert_eq!(config.transition.zoom_in_ms, 900);
        assert_eq!(config.recalibration_window_ms, 1500);
    }

    #[test]
    fn json_roundtrip() {
        let config = CanvasConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(CanvasConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn rejects_zero_tiles() {
        let err = CanvasConfig::from_json(r#"{"tiles": {"tile_count": 0}}"#).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::InvalidConfig { field: "tiles.tile_count", .. }
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = CanvasConfig::default();
        config.tiles.size_range = (23.0, 8.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_thresholds_out_of_order() {
        let mut config = CanvasConfig::default();
        config.edge_exit.arm_proximity = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_duration() {
        let mut config = CanvasConfig::default();
        config.transition.exit_tick_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ChannelError::InvalidConfig { field: "transition.exit_tick_ms", .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            CanvasConfig::from_json("{"),
            Err(ChannelError::Json(_))
        ));
    }

    #[test]
    fn siren_totals_include_fade() {
        let config = CanvasConfig::default();
        assert_eq!(config.siren_total_ms(SirenKind::Shelter), 22_000);
        assert_eq!(config.siren_total_ms(SirenKind::Memorial), 62_000);
    }
}

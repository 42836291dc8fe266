//! Feedback colours for graded clicks.
//!
//! Correct clicks shade from dark green at the center to light green at the
//! precision span. Wrong clicks run green, yellow, red with error severity.
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::numbers::round_f64_to_u8;
use crate::scoring::Grade;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Subtract `amount` from every channel, saturating at zero.
    #[must_use]
    pub const fn darken(self, amount: u8) -> Self {
        Self {
            r: self.r.saturating_sub(amount),
            g: self.g.saturating_sub(amount),
            b: self.b.saturating_sub(amount),
        }
    }

    fn lerp(from: Self, to: Self, t: f64) -> Self {
        let mix = |a: u8, b: u8| round_f64_to_u8(f64::from(a) + (f64::from(b) - f64::from(a)) * t);
        Self {
            r: mix(from.r, to.r),
            g: mix(from.g, to.g),
            b: mix(from.b, to.b),
        }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

const PRECISE_GREEN: Rgb = Rgb::new(26, 95, 26);
const LOOSE_GREEN: Rgb = Rgb::new(144, 238, 144);
const NEAR_GREEN: Rgb = Rgb::new(46, 204, 113);
const MID_YELLOW: Rgb = Rgb::new(255, 241, 118);
const FAR_RED: Rgb = Rgb::new(255, 107, 60);
const TARGET_GOLD: Rgb = Rgb::new(255, 215, 0);
const TARGET_BORDER: Rgb = Rgb::new(218, 165, 32);

const CORRECT_BORDER_DARKEN: u8 = 30;
const WRONG_BORDER_DARKEN: u8 = 20;

/// Fill for a correct click `offset_km` from the centroid.
#[must_use]
pub fn precision_color(offset_km: f64, cfg: &ScoringConfig) -> Rgb {
    let t = (offset_km / cfg.precision_span_km).clamp(0.0, 1.0);
    Rgb::lerp(PRECISE_GREEN, LOOSE_GREEN, t)
}

/// Fill for a wrong click with the given normalized severity.
#[must_use]
pub fn error_color(severity: f64) -> Rgb {
    let severity = severity.clamp(0.0, 1.0);
    if severity < 0.5 {
        Rgb::lerp(NEAR_GREEN, MID_YELLOW, severity * 2.0)
    } else {
        Rgb::lerp(MID_YELLOW, FAR_RED, (severity - 0.5) * 2.0)
    }
}

/// Fill and border colours for highlighting a region on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub fill: Rgb,
    pub border: Rgb,
}

impl Highlight {
    /// Highlight for the region the player clicked.
    #[must_use]
    pub fn for_grade(grade: &Grade, cfg: &ScoringConfig) -> Self {
        if grade.correct {
            let fill = precision_color(grade.click_offset_km.unwrap_or(0.0), cfg);
            Self {
                fill,
                border: fill.darken(CORRECT_BORDER_DARKEN),
            }
        } else {
            let fill = error_color(grade.error_severity.unwrap_or(1.0));
            Self {
                fill,
                border: fill.darken(WRONG_BORDER_DARKEN),
            }
        }
    }

    /// Highlight revealing the correct region after a miss.
    #[must_use]
    pub const fn target() -> Self {
        Self {
            fill: TARGET_GOLD,
            border: TARGET_BORDER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_gradient_endpoints() {
        let cfg = ScoringConfig::default();
        assert_eq!(precision_color(0.0, &cfg), PRECISE_GREEN);
        assert_eq!(precision_color(50.0, &cfg), LOOSE_GREEN);
        assert_eq!(precision_color(80.0, &cfg), LOOSE_GREEN);
        assert_eq!(precision_color(25.0, &cfg), Rgb::new(85, 167, 85));
    }

    #[test]
    fn error_gradient_passes_through_yellow() {
        assert_eq!(error_color(0.0), NEAR_GREEN);
        assert_eq!(error_color(0.5), MID_YELLOW);
        assert_eq!(error_color(1.0), FAR_RED);
        assert_eq!(error_color(3.0), FAR_RED);
    }

    #[test]
    fn error_gradient_moves_away_from_green() {
        let mut previous = error_color(0.0);
        for step in 1..=10 {
            let next = error_color(f64::from(step) / 10.0);
            assert!(next.r >= previous.r, "red channel fell at step {step}");
            previous = next;
        }
    }

    #[test]
    fn darken_saturates() {
        assert_eq!(Rgb::new(10, 40, 200).darken(30), Rgb::new(0, 10, 170));
        assert_eq!(Rgb::new(46, 204, 113).to_string(), "rgb(46, 204, 113)");
    }

    #[test]
    fn highlight_follows_grade() {
        let cfg = ScoringConfig::default();
        let hit = Highlight::for_grade(&Grade::hit(0.0, 1.0), &cfg);
        assert_eq!(hit.fill, PRECISE_GREEN);
        assert_eq!(hit.border, Rgb::new(0, 65, 0));

        let miss = Highlight::for_grade(&Grade::miss(300.0, 1.0), &cfg);
        assert_eq!(miss.fill, FAR_RED);
        assert_eq!(miss.border, Rgb::new(235, 87, 40));
        assert_eq!(Highlight::target().fill, TARGET_GOLD);
    }
}

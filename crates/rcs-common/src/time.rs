//! ---
//! rcs_section: "01-core-functionality"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Shared primitives and utilities for the simulator runtime."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::time::Duration;

/// Slowest permitted simulation speed multiplier.
pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;
/// Fastest permitted simulation speed multiplier.
pub const MAX_SPEED_MULTIPLIER: f64 = 10.0;

/// Clamp a requested speed multiplier into the supported range.
///
/// Non-finite requests fall back to real time.
pub fn clamp_speed(requested: f64) -> f64 {
    if !requested.is_finite() {
        return 1.0;
    }
    requested.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
}

/// Wall-clock period between ticks for the given base period and multiplier.
pub fn tick_interval(base: Duration, speed: f64) -> Duration {
    base.div_f64(clamp_speed(speed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_clamped_to_supported_range() {
        assert_eq!(clamp_speed(25.0), 10.0);
        assert_eq!(clamp_speed(0.0), 0.1);
        assert_eq!(clamp_speed(-3.0), 0.1);
        assert_eq!(clamp_speed(2.5), 2.5);
        assert_eq!(clamp_speed(f64::NAN), 1.0);
    }

    #[test]
    fn interval_scales_inversely_with_speed() {
        let base = Duration::from_millis(1000);
        assert_eq!(tick_interval(base, 1.0), Duration::from_millis(1000));
        assert_eq!(tick_interval(base, 4.0), Duration::from_millis(250));
        assert_eq!(tick_interval(base, 100.0), Duration::from_millis(100));
    }
}

//! Heatmap color palette
//!
//! Three-stop linear ramp: emerald at 0.0, amber at 0.5, rose at 1.0.

use crate::types::Rgb;

/// A palette control point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

/// Low pressure (#34d399)
pub const EMERALD: Rgb = Rgb::new(52, 211, 153);
/// Mid pressure (#f59e0b)
pub const AMBER: Rgb = Rgb::new(245, 158, 11);
/// High pressure (#ef4444)
pub const ROSE: Rgb = Rgb::new(239, 68, 68);

pub const HEATMAP_STOPS: [ColorStop; 3] = [
    ColorStop { t: 0.0, color: EMERALD },
    ColorStop { t: 0.5, color: AMBER },
    ColorStop { t: 1.0, color: ROSE },
];

/// Map an intensity to its display color.
///
/// Values outside 0-1 (and NaN) clamp to the nearest end color.
pub fn color_of(intensity: f64) -> Rgb {
    let first = HEATMAP_STOPS[0];
    let last = HEATMAP_STOPS[HEATMAP_STOPS.len() - 1];

    if intensity.is_nan() || intensity <= first.t {
        return first.color;
    }
    if intensity >= last.t {
        return last.color;
    }

    for pair in HEATMAP_STOPS.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if intensity <= hi.t {
            let t = (intensity - lo.t) / (hi.t - lo.t);
            return Rgb::new(
                mix(lo.color.r, hi.color.r, t),
                mix(lo.color.g, hi.color.g, t),
                mix(lo.color.b, hi.color.b, t),
            );
        }
    }

    first.color
}

fn mix(a: u8, b: u8, t: f64) -> u8 {
    let v = a as f64 + (b as f64 - a as f64) * t;
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stops_exact() {
        assert_eq!(color_of(0.0), EMERALD);
        assert_eq!(color_of(0.5), AMBER);
        assert_eq!(color_of(1.0), ROSE);
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(color_of(-0.5), EMERALD);
        assert_eq!(color_of(1.7), ROSE);
        assert_eq!(color_of(f64::NAN), EMERALD);
        assert_eq!(color_of(f64::INFINITY), ROSE);
    }

    #[test]
    fn test_interpolates_first_segment() {
        // Quarter way: halfway between emerald and amber
        assert_eq!(color_of(0.25), Rgb::new(149, 185, 82));
    }

    #[test]
    fn test_interpolates_second_segment() {
        assert_eq!(color_of(0.75), Rgb::new(242, 113, 40));
    }

    #[test]
    fn test_hex() {
        assert_eq!(EMERALD.to_hex(), "#34d399");
        assert_eq!(AMBER.to_hex(), "#f59e0b");
        assert_eq!(ROSE.to_hex(), "#ef4444");
    }
}

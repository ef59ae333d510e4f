use std::f64::consts::PI;
use std::sync::Arc;

use mandelmaps_core::FractalFamily;

/// Fully opaque black, `0xAARRGGBB`.
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;

/// Maps an escape-time result to a packed `0xAARRGGBB` colour.
///
/// Implementations must be deterministic and free of side effects: the
/// scheduler may colour the same iteration count on several threads and
/// expects identical output. Alpha is always `0xFF`.
pub trait ColorMapper: Send + Sync {
    fn color(&self, iterations: u32, max_iterations: u32) -> u32;

    /// Short name, recorded in exported image metadata.
    fn name(&self) -> &str;
}

#[inline]
fn pack(r: u32, g: u32, b: u32) -> u32 {
    OPAQUE_BLACK | (r.min(255) << 16) | (g.min(255) << 8) | b.min(255)
}

// ---------------------------------------------------------------------------
// Cosine ramp
// ---------------------------------------------------------------------------

/// Red saturates fast, green ramps linearly, blue oscillates.
///
/// With `t = iterations / max_iterations`:
/// `R = min(255, 255·k·t)`, `G = 255·t`, `B = 127.5 − 127.5·cos(m·π·t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineRamp {
    /// `k`: how quickly red saturates.
    pub red_gain: f64,
    /// `m`: number of half-periods the blue channel runs through.
    pub blue_frequency: f64,
}

impl CosineRamp {
    pub const MANDELBROT: Self = Self {
        red_gain: 6.0,
        blue_frequency: 7.0,
    };

    pub const JULIA: Self = Self {
        red_gain: 2.0,
        blue_frequency: 3.0,
    };

    pub fn for_family(family: FractalFamily) -> Self {
        match family {
            FractalFamily::Mandelbrot => Self::MANDELBROT,
            FractalFamily::Julia => Self::JULIA,
        }
    }
}

impl ColorMapper for CosineRamp {
    fn color(&self, iterations: u32, max_iterations: u32) -> u32 {
        let t = if max_iterations == 0 {
            1.0
        } else {
            (iterations as f64 / max_iterations as f64).clamp(0.0, 1.0)
        };
        // Float-to-int `as` saturates, so negative rounding noise lands on 0.
        let r = (255.0 * self.red_gain * t) as u32;
        let g = (255.0 * t) as u32;
        let b = (127.5 - 127.5 * (self.blue_frequency * PI * t).cos()) as u32;
        pack(r, g, b)
    }

    fn name(&self) -> &str {
        "cosine-ramp"
    }
}

// ---------------------------------------------------------------------------
// Spiral
// ---------------------------------------------------------------------------

/// Walks a parametric spiral through RGB space, one turn per 255 iterations.
///
/// Channel values are reflected back into `0..=RANGE` and offset by `START`.
/// Points that never escaped, and points that escaped immediately, are black.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spiral;

impl Spiral {
    const RANGE: i64 = 230;
    const START: i64 = 25;

    /// Fold `c` into `0..=range` by reflecting at the edges.
    fn bound(mut c: i64, range: i64) -> i64 {
        let period = range * 2;
        if c > period {
            c -= period * (c / period);
        }
        if c > range {
            c = range - (c - range);
        }
        c
    }

    fn channel(v: f64) -> u32 {
        (Self::bound((Self::RANGE as f64 * v) as i64, Self::RANGE) + Self::START) as u32
    }
}

impl ColorMapper for Spiral {
    fn color(&self, iterations: u32, max_iterations: u32) -> u32 {
        if iterations == 0 || iterations >= max_iterations {
            return OPAQUE_BLACK;
        }
        let theta = iterations as f64 / 255.0 * 2.0 * PI;
        let r = theta;
        let x2 = theta * 2.0 * (theta.cos() + 1.0);
        let y2 = theta * 2.0 * (theta.sin() + 1.0);
        pack(Self::channel(r), Self::channel(y2), Self::channel(x2))
    }

    fn name(&self) -> &str {
        "spiral"
    }
}

/// The scheme used for a family when the host has not picked one.
pub fn default_mapper(family: FractalFamily) -> Arc<dyn ColorMapper> {
    Arc::new(CosineRamp::for_family(family))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(argb: u32) -> (u32, u32, u32, u32) {
        (argb >> 24, (argb >> 16) & 0xFF, (argb >> 8) & 0xFF, argb & 0xFF)
    }

    #[test]
    fn alpha_is_always_opaque() {
        let mappers: [&dyn ColorMapper; 3] =
            [&CosineRamp::MANDELBROT, &CosineRamp::JULIA, &Spiral];
        for mapper in mappers {
            for max in [1, 7, 256, 10_000] {
                for it in [0, 1, max / 2, max - 1, max, max + 5] {
                    assert_eq!(mapper.color(it, max) >> 24, 0xFF, "{}", mapper.name());
                }
            }
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        let m = CosineRamp::MANDELBROT;
        for it in 0..300 {
            assert_eq!(m.color(it, 300), m.color(it, 300));
            assert_eq!(Spiral.color(it, 300), Spiral.color(it, 300));
        }
    }

    #[test]
    fn cosine_ramp_endpoints() {
        // t = 0: all channels at their minimum.
        assert_eq!(CosineRamp::MANDELBROT.color(0, 100), 0xFF00_0000);
        // t = 1: red and green saturate, blue = 127.5 − 127.5·cos(7π) = 255.
        let (_, r, g, b) = channels(CosineRamp::MANDELBROT.color(100, 100));
        assert_eq!((r, g, b), (255, 255, 255));
        // Julia: cos(3π) = −1 as well.
        let (_, r, g, b) = channels(CosineRamp::JULIA.color(100, 100));
        assert_eq!((r, g, b), (255, 255, 255));
    }

    #[test]
    fn cosine_ramp_midpoint() {
        // t = 0.5 with k = 2: red = 255, green = 127, blue = 127.5 − 127.5·cos(1.5π).
        let (_, r, g, b) = channels(CosineRamp::JULIA.color(50, 100));
        assert_eq!(r, 255);
        assert_eq!(g, 127);
        assert_eq!(b, 127);
    }

    #[test]
    fn families_get_distinct_palettes() {
        let m = CosineRamp::MANDELBROT.color(10, 100);
        let j = CosineRamp::JULIA.color(10, 100);
        assert_ne!(m, j);
        assert_eq!(default_mapper(FractalFamily::Julia).color(10, 100), j);
    }

    #[test]
    fn spiral_black_for_trivial_and_interior_points() {
        assert_eq!(Spiral.color(0, 100), OPAQUE_BLACK);
        assert_eq!(Spiral.color(100, 100), OPAQUE_BLACK);
        assert_ne!(Spiral.color(40, 100), OPAQUE_BLACK);
    }

    #[test]
    fn spiral_channels_stay_in_range() {
        for it in 1..2000 {
            let (_, r, g, b) = channels(Spiral.color(it, 5000));
            for c in [r, g, b] {
                assert!((25..=255).contains(&c), "iteration {it}: channel {c}");
            }
        }
    }

    #[test]
    fn bound_reflects_into_range() {
        assert_eq!(Spiral::bound(100, 230), 100);
        assert_eq!(Spiral::bound(300, 230), 160);
        assert_eq!(Spiral::bound(460, 230), 0);
        assert_eq!(Spiral::bound(500, 230), 40);
    }
}

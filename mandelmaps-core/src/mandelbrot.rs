use crate::complex::Complex;
use crate::fractal::{EscapeTime, ESCAPE_RADIUS_SQ};

/// Returns `true` if `c` lies inside the main cardioid.
///
/// Closed-form membership test; these points would otherwise burn the
/// whole iteration budget.
#[inline]
fn in_cardioid(re: f64, im: f64) -> bool {
    let im2 = im * im;
    let q = (re - 0.25) * (re - 0.25) + im2;
    q * (q + (re - 0.25)) <= 0.25 * im2
}

/// Returns `true` if `c` lies inside the period-2 bulb.
#[inline]
fn in_period2_bulb(re: f64, im: f64) -> bool {
    (re + 1.0) * (re + 1.0) + im * im <= 0.0625
}

/// Mandelbrot escape time: `z ← z² + c` from `z₀ = 0`.
pub fn escape_time(c: Complex, max_iterations: u32) -> EscapeTime {
    if in_cardioid(c.re, c.im) || in_period2_bulb(c.re, c.im) {
        return EscapeTime::interior(max_iterations);
    }

    let mut z = Complex::ZERO;
    for n in 0..max_iterations {
        z = z.square() + c;
        if z.norm_sq() > ESCAPE_RADIUS_SQ {
            return EscapeTime::escaped_at(n);
        }
    }

    EscapeTime::interior(max_iterations)
}

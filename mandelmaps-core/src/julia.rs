use crate::complex::Complex;
use crate::fractal::{EscapeTime, ESCAPE_RADIUS_SQ};

/// Julia escape time: `z ← z² + c` from `z₀ = point`, with `c` fixed.
pub fn escape_time(point: Complex, c: Complex, max_iterations: u32) -> EscapeTime {
    let mut z = point;
    for n in 0..max_iterations {
        z = z.square() + c;
        if z.norm_sq() > ESCAPE_RADIUS_SQ {
            return EscapeTime::escaped_at(n);
        }
    }
    EscapeTime::interior(max_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOUADY_RABBIT: Complex = Complex {
        re: -0.122561,
        im: 0.744862,
    };

    #[test]
    fn far_point_escapes() {
        let r = escape_time(Complex::new(10.0, 0.0), DOUADY_RABBIT, 256);
        assert_eq!(r, EscapeTime::escaped_at(0));
    }

    #[test]
    fn c_zero_origin_is_fixed_point() {
        assert_eq!(
            escape_time(Complex::ZERO, Complex::ZERO, 128),
            EscapeTime::interior(128)
        );
    }

    #[test]
    fn c_zero_outside_unit_disc_escapes() {
        // z ← z² diverges for |z| > 1: 1.5 → 2.25 → 5.06 (|z|² > 4 at index 0).
        let r = escape_time(Complex::new(1.5, 0.0), Complex::ZERO, 64);
        assert_eq!(r, EscapeTime::escaped_at(0));
        let r = escape_time(Complex::new(1.2, 0.0), Complex::ZERO, 64);
        assert_eq!(r, EscapeTime::escaped_at(1));
    }

    #[test]
    fn deterministic_results() {
        let points = [
            Complex::new(0.0, 0.0),
            Complex::new(0.5, 0.5),
            Complex::new(-1.0, 0.3),
        ];
        let run1: Vec<_> = points.iter().map(|&p| escape_time(p, DOUADY_RABBIT, 500)).collect();
        let run2: Vec<_> = points.iter().map(|&p| escape_time(p, DOUADY_RABBIT, 500)).collect();
        assert_eq!(run1, run2);
    }
}

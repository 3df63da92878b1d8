use libm::sincos;
use serde::{Deserialize, Serialize};

pub const SQRT3: f64 = 1.7320508075688772;
pub const SQRT3_BY_2: f64 = SQRT3 / 2.0;
pub const ONE_BY_SQRT3: f64 = 1.0 / SQRT3;

/// Three phase quantity, units of amps or volts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Abc {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Stationary frame quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlphaBeta {
    pub alpha: f64,
    pub beta: f64,
}

/// Rotor frame quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dq {
    pub d: f64,
    pub q: f64,
}

impl Abc {
    pub fn new(a: f64, b: f64, c: f64) -> Abc {
        Abc { a, b, c }
    }

    // amplitude invariant, assumes a + b + c = 0 so c is never read
    pub fn clarke_transform(&self) -> AlphaBeta {
        AlphaBeta {
            alpha: self.a,
            beta: (self.a + 2.0 * self.b) * ONE_BY_SQRT3,
        }
    }
}

impl AlphaBeta {
    pub fn new(alpha: f64, beta: f64) -> AlphaBeta {
        AlphaBeta { alpha, beta }
    }

    pub fn park_transform(&self, angle: f64) -> Dq {
        let (s, c) = sincos(angle);

        Dq {
            d: self.alpha * c + self.beta * s,
            q: self.beta * c - self.alpha * s,
        }
    }

    pub fn inv_clarke_transform(&self) -> Abc {
        Abc {
            a: self.alpha,
            b: -0.5 * self.alpha + SQRT3_BY_2 * self.beta,
            c: -0.5 * self.alpha - SQRT3_BY_2 * self.beta,
        }
    }

    pub fn magnitude(&self) -> f64 {
        libm::sqrt(self.alpha * self.alpha + self.beta * self.beta)
    }

    /// Vector angle in `[0, 2pi)`.
    pub fn angle(&self) -> f64 {
        let angle = libm::atan2(self.beta, self.alpha);
        if angle < 0.0 {
            angle + core::f64::consts::TAU
        } else {
            angle
        }
    }
}

impl Dq {
    pub fn new(d: f64, q: f64) -> Dq {
        Dq { d, q }
    }

    pub fn inv_park_transform(&self, angle: f64) -> AlphaBeta {
        let (s, c) = sincos(angle);

        AlphaBeta {
            alpha: self.d * c - self.q * s,
            beta: self.q * c + self.d * s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, TAU};

    #[test]
    fn test_round_trip() {
        use rand_distr::{Uniform, Distribution};

        let current = Uniform::new(-50.0, 50.0);
        let angle = Uniform::new(-2.0 * TAU, 2.0 * TAU);
        let mut rng = rand::thread_rng();

        for i in 0..10000 {
            let dq = Dq::new(current.sample(&mut rng), current.sample(&mut rng));
            let theta = angle.sample(&mut rng);

            let back = dq
                .inv_park_transform(theta)
                .inv_clarke_transform()
                .clarke_transform()
                .park_transform(theta);

            assert!((back.d - dq.d).abs() < 1e-9, "{}: {:?} came back as {:?}", i, dq, back);
            assert!((back.q - dq.q).abs() < 1e-9, "{}: {:?} came back as {:?}", i, dq, back);
        }
    }

    #[test]
    fn test_inv_clarke_is_balanced() {
        let abc = AlphaBeta::new(3.0, -7.5).inv_clarke_transform();
        assert!((abc.a + abc.b + abc.c).abs() < 1e-12);
    }

    #[test]
    fn test_park_quarter_turn() {
        // at 90 degrees the beta axis lines up with d
        let dq = AlphaBeta::new(0.0, 2.0).park_transform(FRAC_PI_2);
        assert!((dq.d - 2.0).abs() < 1e-12);
        assert!(dq.q.abs() < 1e-12);
    }

    #[test]
    fn test_vector_angle() {
        let v = AlphaBeta::new(0.0, -1.0);
        assert!((v.angle() - 1.5 * core::f64::consts::PI).abs() < 1e-12);
        assert!((v.magnitude() - 1.0).abs() < 1e-12);
    }
}

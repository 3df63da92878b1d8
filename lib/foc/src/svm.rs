use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::transforms::{AlphaBeta, SQRT3, SQRT3_BY_2};

// normalized switching period
const TS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SvpwmOutput {
    pub ta: f64, // phase duty ratios in [0, 1]
    pub tb: f64,
    pub tc: f64,
    pub sector: u8, // 1..=6, commutation sector under six-step
    pub mag: f64,
    pub angle: f64, // [0, 2pi)
}

impl Default for SvpwmOutput {
    fn default() -> Self {
        SvpwmOutput {
            ta: 0.0,
            tb: 0.0,
            tc: 0.0,
            sector: 1,
            mag: 0.0,
            angle: 0.0,
        }
    }
}

/// Sector from the three sign tests on the reference vector.
pub fn calculate_sector(alpha: f64, beta: f64) -> u8 {
    let a = (beta > 0.0) as u8;
    let b = (SQRT3_BY_2 * alpha - 0.5 * beta > 0.0) as u8;
    let c = (-SQRT3_BY_2 * alpha - 0.5 * beta > 0.0) as u8;

    match a + 2 * b + 4 * c {
        3 => 1,
        1 => 2,
        5 => 3,
        4 => 4,
        6 => 5,
        2 => 6,
        // zero vector
        _ => 1,
    }
}

// inputs are alpha and beta voltages in volts, outputs are center aligned duty cycles
fn calculate_svm(alpha: f64, beta: f64, udc: f64, sector: u8) -> (f64, f64, f64) {
    let u1 = beta;
    let u2 = SQRT3_BY_2 * alpha - 0.5 * beta;
    let u3 = -SQRT3_BY_2 * alpha - 0.5 * beta;

    let k = SQRT3 * TS / udc;

    // active vector on-times
    let (t1, t2) = match sector {
        1 => (k * u2, k * u1),
        2 => (-k * u3, -k * u2),
        3 => (k * u1, k * u3),
        4 => (-k * u2, -k * u1),
        5 => (k * u3, k * u2),
        _ => (-k * u1, -k * u3),
    };

    // over-modulation, shrink the vector back onto the hexagon
    let t_sum = t1 + t2;
    let (t1, t2) = if t_sum > TS {
        (t1 * TS / t_sum, t2 * TS / t_sum)
    } else {
        (t1, t2)
    };

    let t0 = (TS - t1 - t2) / 2.0;

    // seven segment comparator levels
    let (t_a, t_b, t_c) = match sector {
        1 => (t1 + t2 + t0, t2 + t0, t0),
        2 => (t1 + t0, t1 + t2 + t0, t0),
        3 => (t0, t1 + t2 + t0, t2 + t0),
        4 => (t0, t1 + t0, t1 + t2 + t0),
        5 => (t2 + t0, t0, t1 + t2 + t0),
        _ => (t1 + t2 + t0, t0, t1 + t0),
    };

    (
        (t_a / TS).clamp(0.0, 1.0),
        (t_b / TS).clamp(0.0, 1.0),
        (t_c / TS).clamp(0.0, 1.0),
    )
}

/// Space vector modulator. Keeps the sector and vector of the last request
/// around for inspection.
#[derive(Debug, Clone, Copy)]
pub struct Svpwm {
    sector: u8,
    mag: f64,
    angle: f64,
}

impl Svpwm {
    pub fn new() -> Svpwm {
        Svpwm {
            sector: 1,
            mag: 0.0,
            angle: 0.0,
        }
    }

    // voltage in, duty cycle out
    pub fn calc(&mut self, request: AlphaBeta, udc: f64) -> SvpwmOutput {
        self.mag = request.magnitude();
        self.angle = request.angle();
        self.sector = calculate_sector(request.alpha, request.beta);

        let (ta, tb, tc) = calculate_svm(request.alpha, request.beta, udc, self.sector);

        SvpwmOutput {
            ta,
            tb,
            tc,
            sector: self.sector,
            mag: self.mag,
            angle: self.angle,
        }
    }

    pub fn get_sector(&self) -> u8 {
        self.sector
    }

    /// Magnitude and angle of the last reference vector.
    pub fn get_vector(&self) -> (f64, f64) {
        (self.mag, self.angle)
    }
}

impl Default for Svpwm {
    fn default() -> Self {
        Self::new()
    }
}

use core::f64::consts::{FRAC_PI_3, PI};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::angle::wrap;

/// Three digital hall sensors spaced 120 electrical degrees apart, each high
/// for half a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct HallState {
    pub ha: bool,
    pub hb: bool,
    pub hc: bool,
    pub sector: u8,    // 1..=6
    pub hall_code: u8, // ha << 2 | hb << 1 | hc
}

impl HallState {
    /// Sectors 1..6 read codes 5, 4, 6, 2, 3, 1.
    pub fn from_electrical_angle(theta_e: f64) -> HallState {
        let theta = wrap(theta_e);

        let ha = theta < PI;
        let hb = (2.0 * FRAC_PI_3..5.0 * FRAC_PI_3).contains(&theta);
        let hc = theta >= 4.0 * FRAC_PI_3 || theta < FRAC_PI_3;

        let sector = (libm::floor(theta / FRAC_PI_3) as u8 + 1).min(6);

        HallState {
            ha,
            hb,
            hc,
            sector,
            hall_code: (ha as u8) << 2 | (hb as u8) << 1 | hc as u8,
        }
    }
}

impl Default for HallState {
    fn default() -> Self {
        HallState {
            ha: false,
            hb: false,
            hc: false,
            sector: 1,
            hall_code: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::TAU;

    #[test]
    fn test_code_sequence() {
        let codes: std::vec::Vec<u8> = (0..6)
            .map(|k| HallState::from_electrical_angle(FRAC_PI_3 * (k as f64 + 0.5)).hall_code)
            .collect();
        assert_eq!(codes, [5u8, 4, 6, 2, 3, 1]);
    }

    #[test]
    fn test_sector_tracks_angle() {
        for i in 0..3600 {
            let theta = TAU * i as f64 / 3600.0;
            let hall = HallState::from_electrical_angle(theta);
            assert!((1..=6).contains(&hall.sector));
            assert_eq!(hall.sector, (theta / FRAC_PI_3) as u8 + 1, "{}", theta);
            // never all high or all low
            assert!(hall.hall_code != 0 && hall.hall_code != 7);
        }
    }

    #[test]
    fn test_one_sensor_changes_per_edge() {
        let mut last = HallState::from_electrical_angle(0.0);
        for i in 1..=3600 {
            let hall = HallState::from_electrical_angle(TAU * i as f64 / 3600.0);
            let flipped = (hall.hall_code ^ last.hall_code).count_ones();
            assert!(flipped <= 1, "step {}: {} -> {}", i, last.hall_code, hall.hall_code);
            last = hall;
        }
    }

    #[test]
    fn test_wraps_negative_angle() {
        assert_eq!(HallState::from_electrical_angle(-0.1), HallState::from_electrical_angle(TAU - 0.1));
        assert_eq!(HallState::default().hall_code, 0);
    }
}

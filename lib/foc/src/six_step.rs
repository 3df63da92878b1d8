use core::f64::consts::{FRAC_PI_3, TAU};

use config::{ConfigError, SixStepParams};

use crate::transforms::Abc;

/// One commutation decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SixStepCommand {
    pub sector: u8,
    pub duty: f64,
    /// Signed phase drive, `±duty` on the two conducting phases, 0 on the
    /// floating one.
    pub phase: Abc,
    /// Per phase PWM duty: `duty` high side, 0 low side, 0.5 floating.
    pub pwm: Abc,
}

/// Trapezoidal 120 degree conduction driven by a single speed PI loop.
#[derive(Debug, Clone, Copy)]
pub struct SixStepController {
    duty: f64,
    kp: f64,
    ki: f64,
    integral: f64,
    integral_max: f64,
}

impl SixStepController {
    pub fn new() -> SixStepController {
        let params = SixStepParams::new();
        SixStepController {
            duty: 0.5,
            kp: params.kp,
            ki: params.ki,
            integral: 0.0,
            integral_max: params.integral_max,
        }
    }

    /// 60 degree sectors numbered from 1 starting at zero electrical angle.
    pub fn calc_sector(&self, theta_e: f64) -> u8 {
        let theta = libm::fmod(theta_e, TAU);
        let theta = if theta < 0.0 { theta + TAU } else { theta };

        let sector = libm::floor(theta / FRAC_PI_3) as i32 + 1;
        sector.clamp(1, 6) as u8
    }

    /// Sector | A | B | C
    /// -------+---+---+---
    ///    1   | + | - | 0
    ///    2   | + | 0 | -
    ///    3   | 0 | + | -
    ///    4   | - | + | 0
    ///    5   | - | 0 | +
    ///    6   | 0 | - | +
    pub fn calc_phase_voltage(&self, sector: u8, duty: f64) -> Abc {
        match sector {
            1 => Abc::new(duty, -duty, 0.0),
            2 => Abc::new(duty, 0.0, -duty),
            3 => Abc::new(0.0, duty, -duty),
            4 => Abc::new(-duty, duty, 0.0),
            5 => Abc::new(-duty, 0.0, duty),
            6 => Abc::new(0.0, -duty, duty),
            _ => Abc::default(),
        }
    }

    pub fn calc(&mut self, theta_e: f64, vel_ref: f64, vel_actual: f64, dt: f64) -> SixStepCommand {
        let error = vel_ref - vel_actual;
        self.integral = (self.integral + error * dt)
            .max(-self.integral_max)
            .min(self.integral_max);

        self.duty = (self.kp * error + self.ki * self.integral).clamp(0.0, 1.0);

        let sector = self.calc_sector(theta_e);
        let phase = self.calc_phase_voltage(sector, self.duty);

        let to_pwm = |v: f64| {
            if v > 0.0 {
                self.duty
            } else if v < 0.0 {
                0.0
            } else {
                0.5
            }
        };

        SixStepCommand {
            sector,
            duty: self.duty,
            phase,
            pwm: Abc::new(to_pwm(phase.a), to_pwm(phase.b), to_pwm(phase.c)),
        }
    }

    pub fn reset(&mut self) {
        self.duty = 0.5;
        self.integral = 0.0;
    }

    /// Default gains and a cleared loop.
    pub fn reset_to_default(&mut self) {
        *self = SixStepController::new();
    }

    pub fn get_duty(&self) -> f64 {
        self.duty
    }

    pub fn get_integral(&self) -> f64 {
        self.integral
    }

    pub fn set_params(&mut self, params: SixStepParams) -> Result<(), ConfigError> {
        params.validate()?;
        self.kp = params.kp;
        self.ki = params.ki;
        self.integral_max = params.integral_max;
        Ok(())
    }

    pub fn get_params(&self) -> SixStepParams {
        SixStepParams {
            kp: self.kp,
            ki: self.ki,
            integral_max: self.integral_max,
        }
    }
}

impl Default for SixStepController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    #[test]
    fn test_sector_examples() {
        let ctrl = SixStepController::new();
        assert_eq!(ctrl.calc_sector(0.1), 1);
        assert_eq!(ctrl.calc_sector(PI), 4);
        assert_eq!(ctrl.calc_sector(0.0), 1);
        assert_eq!(ctrl.calc_sector(-0.1), 6);
        assert_eq!(ctrl.calc_sector(TAU + 0.1), 1);
    }

    #[test]
    fn test_sector_boundaries() {
        let ctrl = SixStepController::new();
        for k in 1..6 {
            let edge = FRAC_PI_3 * k as f64;
            assert_eq!(ctrl.calc_sector(edge + 1e-9), k as u8 + 1);
            assert_eq!(ctrl.calc_sector(edge - 1e-9), k as u8);
        }
    }

    #[test]
    fn test_sector_sweep_is_monotonic() {
        let ctrl = SixStepController::new();
        let mut last = ctrl.calc_sector(0.0);
        for i in 1..100000 {
            let sector = ctrl.calc_sector(TAU * i as f64 / 100000.0);
            assert!((1..=6).contains(&sector));
            assert!(sector >= last, "sector went from {} to {} at step {}", last, sector, i);
            last = sector;
        }
        assert_eq!(last, 6);
    }

    #[test]
    fn test_phase_table_is_balanced() {
        let ctrl = SixStepController::new();
        for sector in 1..=6 {
            let v = ctrl.calc_phase_voltage(sector, 0.7);
            assert_eq!(v.a + v.b + v.c, 0.0);
            let zeros = [v.a, v.b, v.c].iter().filter(|x| **x == 0.0).count();
            assert_eq!(zeros, 1);
        }
        assert_eq!(ctrl.calc_phase_voltage(0, 0.7), Abc::default());
    }

    #[test]
    fn test_pwm_mapping() {
        let mut ctrl = SixStepController::new();
        // kp * 100 saturates the duty
        let cmd = ctrl.calc(0.1, 100.0, 0.0, 1e-4);
        assert_eq!(cmd.sector, 1);
        assert_eq!(cmd.duty, 1.0);
        assert_eq!(cmd.pwm, Abc::new(1.0, 0.0, 0.5));

        let cmd = ctrl.calc(PI, 10.0, 0.0, 1e-4);
        assert_eq!(cmd.sector, 4);
        assert!(cmd.duty > 0.0 && cmd.duty < 1.0);
        assert_eq!(cmd.pwm, Abc::new(0.0, cmd.duty, 0.5));
    }

    #[test]
    fn test_duty_never_negative() {
        let mut ctrl = SixStepController::new();
        let cmd = ctrl.calc(1.0, 0.0, 500.0, 1e-3);
        assert_eq!(cmd.duty, 0.0);
        assert!(ctrl.get_integral() >= -0.8);
    }

    #[test]
    fn test_reset() {
        let mut ctrl = SixStepController::new();
        for _ in 0..100 {
            ctrl.calc(2.0, 100.0, 0.0, 1e-2);
        }
        assert_eq!(ctrl.get_integral(), 0.8);

        ctrl.reset();
        assert_eq!(ctrl.get_duty(), 0.5);
        assert_eq!(ctrl.get_integral(), 0.0);
    }

    #[test]
    fn test_reset_to_default() {
        let mut ctrl = SixStepController::new();
        ctrl.set_params(SixStepParams { kp: 0.5, ki: 2.0, integral_max: 0.1 }).unwrap();
        ctrl.calc(1.0, 100.0, 0.0, 1e-2);

        ctrl.reset_to_default();
        assert_eq!(ctrl.get_params(), SixStepParams::new());
        assert_eq!(ctrl.get_duty(), 0.5);
        assert_eq!(ctrl.get_integral(), 0.0);
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut ctrl = SixStepController::new();
        assert!(ctrl.set_params(SixStepParams { kp: f64::NAN, ki: 0.1, integral_max: 0.8 }).is_err());
        assert!(ctrl.set_params(SixStepParams { kp: 0.1, ki: 0.1, integral_max: 0.0 }).is_err());
        assert_eq!(ctrl.get_params(), SixStepParams::new());
    }
}

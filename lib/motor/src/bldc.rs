use core::f64::consts::{FRAC_PI_3, TAU};

use config::{MotorParams, MotorState};

use crate::{current_derivatives, mechanical_step, update_outputs, MotorModel, MotorType};

/// Brushless DC machine. Currents follow the dq equations with the averaged
/// inductance `(Ld + Lq) / 2` and torque is `1.5 p psi_f iq`. The trapezoidal
/// back-EMF shape is exposed through [`BldcModel::bemf_coeff`].
#[derive(Debug, Clone, Copy)]
pub struct BldcModel {
    params: MotorParams,
    state: MotorState,
}

impl BldcModel {
    pub fn new() -> BldcModel {
        BldcModel {
            params: MotorParams::new(),
            state: MotorState::default(),
        }
    }

    pub fn with_params(params: MotorParams) -> BldcModel {
        BldcModel {
            params,
            state: MotorState::default(),
        }
    }

    /// Trapezoidal back-EMF of one phase relative to its peak, in `[-1, 1]`.
    /// 60 degree ramps and 120 degree flats; phase B lags A by 120 degrees
    /// and C by 240.
    pub fn bemf_coeff(theta_e: f64, phase: usize) -> f64 {
        let offset = phase as f64 * TAU / 3.0;
        let angle = crate::angle::wrap(theta_e - offset);
        let slope = FRAC_PI_3;

        if angle < slope {
            angle / slope
        } else if angle < 2.0 * slope {
            1.0
        } else if angle < 3.0 * slope {
            1.0 - (angle - 2.0 * slope) / slope
        } else if angle < 4.0 * slope {
            -(angle - 3.0 * slope) / slope
        } else if angle < 5.0 * slope {
            -1.0
        } else {
            -1.0 + (angle - 5.0 * slope) / slope
        }
    }

    fn average_inductance(&self) -> f64 {
        (self.params.ld + self.params.lq) / 2.0
    }
}

impl Default for BldcModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorModel for BldcModel {
    fn motor_type(&self) -> MotorType {
        MotorType::Bldc
    }

    fn set_params(&mut self, params: MotorParams) {
        self.params = params;
    }

    fn set_voltage(&mut self, ud: f64, uq: f64) {
        self.state.ud = ud;
        self.state.uq = uq;
    }

    fn set_load_torque(&mut self, tl: f64) {
        self.state.tl = tl;
    }

    fn step(&mut self, dt: f64) {
        let l = self.average_inductance();
        let di = current_derivatives(&self.state, &self.params, l, l);
        self.state.id += di.d * dt;
        self.state.iq += di.q * dt;

        self.state.te = 1.5 * self.params.pole_pairs as f64 * (self.params.psi_f * self.state.iq);
        mechanical_step(&mut self.state, &self.params, dt);
        update_outputs(&mut self.state);
    }

    fn get_state(&self) -> MotorState {
        self.state
    }

    fn get_params(&self) -> MotorParams {
        self.params
    }

    fn reset(&mut self) {
        self.state = MotorState::default();
    }

    fn bemf_coeff(&self, theta_e: f64, phase: usize) -> Option<f64> {
        Some(BldcModel::bemf_coeff(theta_e, phase))
    }
}

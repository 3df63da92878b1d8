use config::{MotorParams, MotorState};

use crate::{current_derivatives, mechanical_step, update_outputs, MotorModel, MotorType};

/// Permanent magnet synchronous machine in the rotor frame:
///
/// ```text
/// ud = Rs id + Ld did/dt - we Lq iq
/// uq = Rs iq + Lq diq/dt + we (Ld id + psi_f)
/// Te = 1.5 p (psi_f iq + (Ld - Lq) id iq)
/// J dwm/dt = Te - Tl - B wm
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PmsmModel {
    params: MotorParams,
    state: MotorState,
}

impl PmsmModel {
    pub fn new() -> PmsmModel {
        PmsmModel {
            params: MotorParams::new(),
            state: MotorState::default(),
        }
    }

    pub fn with_params(params: MotorParams) -> PmsmModel {
        PmsmModel {
            params,
            state: MotorState::default(),
        }
    }

    fn calc_torque(&mut self) {
        let p = &self.params;
        let s = &mut self.state;
        let reluctance = (p.ld - p.lq) * s.id * s.iq;
        s.te = 1.5 * p.pole_pairs as f64 * (p.psi_f * s.iq + reluctance);
    }
}

impl Default for PmsmModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorModel for PmsmModel {
    fn motor_type(&self) -> MotorType {
        MotorType::Pmsm
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
        let di = current_derivatives(&self.state, &self.params, self.params.ld, self.params.lq);
        self.state.id += di.d * dt;
        self.state.iq += di.q * dt;

        self.calc_torque();
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
}

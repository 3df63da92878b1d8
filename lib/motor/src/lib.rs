#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

extern crate alloc;

use alloc::boxed::Box;

use bincode::{Decode, Encode};
use config::{ConfigError, MotorParams, MotorState};
use foc::transforms::Dq;
use serde::{Deserialize, Serialize};

pub mod angle;
pub mod bldc;
pub mod hall;
pub mod pmsm;

pub use crate::bldc::BldcModel;
pub use crate::hall::HallState;
pub use crate::pmsm::PmsmModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum MotorType {
    Pmsm,
    Bldc,
    // reserved, no model yet
    Acim,
    Srm,
}

impl MotorType {
    pub fn name(&self) -> &'static str {
        match self {
            MotorType::Pmsm => "permanent magnet synchronous motor",
            MotorType::Bldc => "brushless dc motor",
            MotorType::Acim => "asynchronous induction motor",
            MotorType::Srm => "switched reluctance motor",
        }
    }
}

/// Plant interface shared by every machine model. One instance owns its
/// state exclusively; only `step` and `reset` mutate it.
pub trait MotorModel {
    fn motor_type(&self) -> MotorType;

    /// Parameters are not checked here; see [`MotorParams::validate`].
    fn set_params(&mut self, params: MotorParams);

    /// dq voltages held until the next call.
    fn set_voltage(&mut self, ud: f64, uq: f64);

    fn set_load_torque(&mut self, tl: f64);

    /// Advances the model by one explicit Euler step.
    fn step(&mut self, dt: f64);

    fn get_state(&self) -> MotorState;

    fn get_params(&self) -> MotorParams;

    fn reset(&mut self);

    /// Normalized trapezoidal back-EMF of `phase` (0 = A, 1 = B, 2 = C),
    /// for models that have one.
    fn bemf_coeff(&self, _theta_e: f64, _phase: usize) -> Option<f64> {
        None
    }
}

pub fn supported_types() -> [MotorType; 2] {
    [MotorType::Pmsm, MotorType::Bldc]
}

/// Fresh model of the requested type with default parameters, or `None` for
/// reserved types.
pub fn create(motor_type: MotorType) -> Option<Box<dyn MotorModel>> {
    match motor_type {
        MotorType::Pmsm => Some(Box::new(PmsmModel::new())),
        MotorType::Bldc => Some(Box::new(BldcModel::new())),
        MotorType::Acim | MotorType::Srm => None,
    }
}

pub fn create_with_params(motor_type: MotorType, params: MotorParams) -> Result<Option<Box<dyn MotorModel>>, ConfigError> {
    params.validate()?;
    Ok(create(motor_type).map(|mut model| {
        model.set_params(params);
        model
    }))
}

/// dq current derivatives of a salient machine.
pub(crate) fn current_derivatives(state: &MotorState, params: &MotorParams, ld: f64, lq: f64) -> Dq {
    let omega_e = state.omega_e;

    Dq {
        d: (state.ud - params.rs * state.id + omega_e * lq * state.iq) / ld,
        q: (state.uq - params.rs * state.iq - omega_e * (ld * state.id + params.psi_f)) / lq,
    }
}

/// Integrates the rotor with the torque already in `state.te`.
pub(crate) fn mechanical_step(state: &mut MotorState, params: &MotorParams, dt: f64) {
    let domega_m = (state.te - state.tl - params.b * state.omega_m) / params.j;
    state.omega_m += domega_m * dt;
    state.omega_e = params.pole_pairs as f64 * state.omega_m;

    state.theta_e = angle::wrap(state.theta_e + state.omega_e * dt);
    state.theta_m += state.omega_m * dt;
}

/// Stationary frame and phase quantities from the dq ones.
pub(crate) fn update_outputs(state: &mut MotorState) {
    let i_ab = Dq::new(state.id, state.iq).inv_park_transform(state.theta_e);
    let u_ab = Dq::new(state.ud, state.uq).inv_park_transform(state.theta_e);
    let i_abc = i_ab.inv_clarke_transform();
    let u_abc = u_ab.inv_clarke_transform();

    state.i_alpha = i_ab.alpha;
    state.i_beta = i_ab.beta;
    state.u_alpha = u_ab.alpha;
    state.u_beta = u_ab.beta;

    state.ia = i_abc.a;
    state.ib = i_abc.b;
    state.ic = i_abc.c;
    state.ua = u_abc.a;
    state.ub = u_abc.b;
    state.uc = u_abc.c;
}

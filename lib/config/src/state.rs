use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Electrical and mechanical state of one machine. Angles in rad, speeds in
/// rad/s, currents in A, voltages in V, torques in N m.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Encode, Decode)]
pub struct MotorState {
    pub theta_e: f64, // always in [0, 2pi)
    pub theta_m: f64, // continuous, not wrapped
    pub omega_e: f64,
    pub omega_m: f64,

    pub id: f64,
    pub iq: f64,
    pub ud: f64,
    pub uq: f64,

    pub ia: f64,
    pub ib: f64,
    pub ic: f64,
    pub ua: f64,
    pub ub: f64,
    pub uc: f64,

    pub i_alpha: f64,
    pub i_beta: f64,
    pub u_alpha: f64,
    pub u_beta: f64,

    pub te: f64,
    pub tl: f64,
}

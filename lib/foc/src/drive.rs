use core::f64::consts::PI;

use bincode::{Decode, Encode};
use config::MotorState;
use serde::{Deserialize, Serialize};

use crate::six_step::SixStepController;
use crate::svm::SvpwmOutput;
use crate::transforms::{Abc, Dq};

/// The six-step table puts the sector 1 vector at -30 degrees. Commutating on
/// the rotor angle advanced by 150 degrees keeps the applied vector within
/// ±30 degrees of the q axis.
pub const SIX_STEP_ADVANCE: f64 = 5.0 * PI / 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub enum ControlMode {
    #[default]
    Foc,
    SixStep,
}

/// Stages of one control tick, in the order a FOC tick runs through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum PipelineStage {
    Idle,
    Sampling,
    Clark,
    Park,
    CurrentLoop,
    VelocityLoop,
    PositionLoop,
    InvPark,
    Svpwm,
    Output,
    MotorModel,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Sampling => "sampling",
            PipelineStage::Clark => "clark",
            PipelineStage::Park => "park",
            PipelineStage::CurrentLoop => "current loop",
            PipelineStage::VelocityLoop => "velocity loop",
            PipelineStage::PositionLoop => "position loop",
            PipelineStage::InvPark => "inverse park",
            PipelineStage::Svpwm => "svpwm",
            PipelineStage::Output => "output",
            PipelineStage::MotorModel => "motor model",
        }
    }
}

/// What a control path hands to the plant and to observers.
///
/// On the six-step path `pwm` mirrors the commutation duties and
/// `pwm.sector` is the commutation sector, taken at the rotor angle plus
/// [`SIX_STEP_ADVANCE`]. At zero rotor angle it reads 3 while the rotor
/// sector is 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveOutput {
    pub voltage: Dq,
    pub pwm: SvpwmOutput,
}

/// Six-step path. The signed phase drive is scaled to half the bus per
/// conducting phase and projected back into dq so the same plant interface
/// applies.
pub fn commutate(
    ctrl: &mut SixStepController,
    state: &MotorState,
    vel_ref: f64,
    dt: f64,
    udc: f64,
    on_stage: &mut impl FnMut(PipelineStage),
) -> DriveOutput {
    on_stage(PipelineStage::Sampling);
    let theta = state.theta_e;

    on_stage(PipelineStage::VelocityLoop);
    let cmd = ctrl.calc(theta + SIX_STEP_ADVANCE, vel_ref, state.omega_m, dt);

    on_stage(PipelineStage::Output);
    let half_bus = 0.5 * udc;
    let phase_voltage = Abc::new(cmd.phase.a * half_bus, cmd.phase.b * half_bus, cmd.phase.c * half_bus);

    on_stage(PipelineStage::Clark);
    let u_ab = phase_voltage.clarke_transform();

    on_stage(PipelineStage::Park);
    let voltage = u_ab.park_transform(theta);

    DriveOutput {
        voltage,
        pwm: SvpwmOutput {
            ta: cmd.pwm.a,
            tb: cmd.pwm.b,
            tc: cmd.pwm.c,
            sector: cmd.sector,
            mag: u_ab.magnitude(),
            angle: u_ab.angle(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;
    use core::f64::consts::TAU;

    #[test]
    fn test_commutation_gives_forward_torque() {
        let mut ctrl = SixStepController::new();

        for i in 0..360 {
            ctrl.reset();
            let state = MotorState { theta_e: TAU * i as f64 / 360.0, ..MotorState::default() };
            let out = commutate(&mut ctrl, &state, 100.0, 1e-4, 24.0, &mut |_| {});

            // the applied vector stays within 30 degrees of q
            assert!(out.voltage.q > 0.0, "{} degrees: {:?}", i, out.voltage);
            assert!(out.voltage.q + 1e-9 >= libm::sqrt(3.0) * out.voltage.d.abs(), "{} degrees: {:?}", i, out.voltage);
        }
    }

    #[test]
    fn test_commutation_stage_order() {
        let mut ctrl = SixStepController::new();
        let mut stages = Vec::new();
        commutate(&mut ctrl, &MotorState::default(), 10.0, 1e-4, 24.0, &mut |s| stages.push(s));

        assert_eq!(
            stages,
            vec![
                PipelineStage::Sampling,
                PipelineStage::VelocityLoop,
                PipelineStage::Output,
                PipelineStage::Clark,
                PipelineStage::Park,
            ]
        );
    }

    #[test]
    fn test_commutation_mirrors_duty() {
        let mut ctrl = SixStepController::new();
        let out = commutate(&mut ctrl, &MotorState::default(), 100.0, 1e-4, 24.0, &mut |_| {});
        // zero angle advanced by 150 degrees lands in sector 3, B high C low
        assert_eq!(out.pwm.sector, 3);
        assert_eq!((out.pwm.ta, out.pwm.tb, out.pwm.tc), (0.5, 1.0, 0.0));
    }

    #[test]
    fn test_commutation_sector_leads_rotor_sector() {
        let mut ctrl = SixStepController::new();
        for i in 0..360 {
            let theta_e = (i as f64 + 0.5) * TAU / 360.0;
            let state = MotorState { theta_e, ..MotorState::default() };
            let out = commutate(&mut ctrl, &state, 0.0, 1e-4, 24.0, &mut |_| {});

            // 150 degrees of advance is two or three sectors
            let rotor = ctrl.calc_sector(theta_e);
            assert_eq!(out.pwm.sector, ctrl.calc_sector(theta_e + SIX_STEP_ADVANCE));
            let lead = (out.pwm.sector + 6 - rotor) % 6;
            assert!(lead == 2 || lead == 3, "theta_e = {}, lead = {}", theta_e, lead);
        }
    }
}

use config::MotorState;

use crate::cascade::LoopController;
use crate::drive::{DriveOutput, PipelineStage};
use crate::svm::Svpwm;
use crate::transforms::{Abc, Dq};

/// FOC path: measured phase currents through Clark and Park, the loop
/// cascade, inverse Park and space vector modulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldOrientedControl {
    svm: Svpwm,
}

impl FieldOrientedControl {
    pub fn new() -> FieldOrientedControl {
        FieldOrientedControl { svm: Svpwm::new() }
    }

    pub fn get_dq(&self, state: &MotorState) -> Dq {
        Abc::new(state.ia, state.ib, state.ic)
            .clarke_transform()
            .park_transform(state.theta_e)
    }

    pub fn update(
        &mut self,
        ctrl: &mut LoopController,
        state: &MotorState,
        dt: f64,
        udc: f64,
        on_stage: &mut impl FnMut(PipelineStage),
    ) -> DriveOutput {
        let angle = state.theta_e;

        on_stage(PipelineStage::Sampling);
        let phase_currents = Abc::new(state.ia, state.ib, state.ic);

        on_stage(PipelineStage::Clark);
        let i_ab = phase_currents.clarke_transform();

        on_stage(PipelineStage::Park);
        let dq_currents = i_ab.park_transform(angle);

        let feedback = MotorState {
            id: dq_currents.d,
            iq: dq_currents.q,
            ..*state
        };

        if ctrl.is_position_loop_enabled() {
            on_stage(PipelineStage::PositionLoop);
        }
        if ctrl.is_velocity_loop_enabled() {
            on_stage(PipelineStage::VelocityLoop);
        }
        if ctrl.is_current_loop_enabled() {
            on_stage(PipelineStage::CurrentLoop);
        }
        let request = ctrl.calc(&feedback, dt);
        let voltage_request = Dq::new(request.id_ref, request.iq_ref);

        on_stage(PipelineStage::InvPark);
        let u_ab = voltage_request.inv_park_transform(angle);

        on_stage(PipelineStage::Svpwm);
        let pwm = self.svm.calc(u_ab, udc);

        on_stage(PipelineStage::Output);
        DriveOutput {
            voltage: voltage_request,
            pwm,
        }
    }

    pub fn svm(&self) -> &Svpwm {
        &self.svm
    }
}

use config::{ConfigError, ControlTarget, MotorParams, MotorState, PidParams, DEFAULT_BUS_VOLTAGE};

use crate::pid::PidController;

/// Position -> velocity -> current cascade, each stage independently
/// switchable. A disabled outer stage passes the caller's reference through.
#[derive(Debug, Clone)]
pub struct LoopController {
    current_enabled: bool,
    velocity_enabled: bool,
    position_enabled: bool,

    id_pid: PidController,
    iq_pid: PidController,
    vel_pid: PidController,
    pos_pid: PidController,

    target: ControlTarget,

    vel_ref_internal: f64,
    iq_ref_internal: f64,
}

impl LoopController {
    pub fn new() -> LoopController {
        let motor = MotorParams::new();
        let current = PidParams::imc_current(&motor, DEFAULT_BUS_VOLTAGE);

        LoopController {
            current_enabled: true,
            velocity_enabled: true,
            position_enabled: false,
            id_pid: PidController::new(current),
            iq_pid: PidController::new(current),
            vel_pid: PidController::new(PidParams::default_velocity()),
            pos_pid: PidController::new(PidParams::imc_position(&motor)),
            target: ControlTarget::new(),
            vel_ref_internal: 0.0,
            iq_ref_internal: 0.0,
        }
    }

    /// Runs the enabled stages and returns the dq voltage request in the
    /// `id_ref`/`iq_ref` slots, the resolved speed reference and the
    /// caller's position reference.
    pub fn calc(&mut self, state: &MotorState, dt: f64) -> ControlTarget {
        let vel_ref = if self.position_enabled {
            self.pos_pid.calc(self.target.pos_ref, state.theta_e, dt)
        } else {
            self.target.vel_ref
        };

        let iq_ref = if self.velocity_enabled {
            self.vel_pid.calc(vel_ref, state.omega_m, dt)
        } else {
            self.target.iq_ref
        };

        self.vel_ref_internal = vel_ref;
        self.iq_ref_internal = iq_ref;

        let (ud, uq) = if self.current_enabled {
            (
                self.id_pid.calc(self.target.id_ref, state.id, dt),
                self.iq_pid.calc(iq_ref, state.iq, dt),
            )
        } else {
            (0.0, 0.0)
        };

        ControlTarget {
            id_ref: ud,
            iq_ref: uq,
            vel_ref,
            pos_ref: self.target.pos_ref,
        }
    }

    pub fn reset(&mut self) {
        self.id_pid.reset();
        self.iq_pid.reset();
        self.vel_pid.reset();
        self.pos_pid.reset();
    }

    /// Back to the IMC tuned gains, the default target and default loop
    /// enables.
    pub fn reset_to_default(&mut self) {
        *self = LoopController::new();
    }

    pub fn set_current_loop_enabled(&mut self, enabled: bool) {
        self.current_enabled = enabled;
    }

    pub fn set_velocity_loop_enabled(&mut self, enabled: bool) {
        self.velocity_enabled = enabled;
    }

    pub fn set_position_loop_enabled(&mut self, enabled: bool) {
        self.position_enabled = enabled;
    }

    pub fn is_current_loop_enabled(&self) -> bool {
        self.current_enabled
    }

    pub fn is_velocity_loop_enabled(&self) -> bool {
        self.velocity_enabled
    }

    pub fn is_position_loop_enabled(&self) -> bool {
        self.position_enabled
    }

    pub fn set_current_pid(&mut self, id_pid: PidParams, iq_pid: PidParams) -> Result<(), ConfigError> {
        id_pid.validate("id_pid")?;
        iq_pid.validate("iq_pid")?;
        self.id_pid.set_params(id_pid);
        self.iq_pid.set_params(iq_pid);
        Ok(())
    }

    pub fn set_velocity_pid(&mut self, pid: PidParams) -> Result<(), ConfigError> {
        self.vel_pid.try_set_params(pid, "velocity_pid")
    }

    pub fn set_position_pid(&mut self, pid: PidParams) -> Result<(), ConfigError> {
        self.pos_pid.try_set_params(pid, "position_pid")
    }

    pub fn get_id_pid(&self) -> PidParams {
        self.id_pid.get_params()
    }

    pub fn get_iq_pid(&self) -> PidParams {
        self.iq_pid.get_params()
    }

    pub fn get_vel_pid(&self) -> PidParams {
        self.vel_pid.get_params()
    }

    pub fn get_pos_pid(&self) -> PidParams {
        self.pos_pid.get_params()
    }

    pub fn set_target(&mut self, target: ControlTarget) {
        self.target = target;
    }

    pub fn get_target(&self) -> ControlTarget {
        self.target
    }

    pub fn get_id_ref(&self) -> f64 {
        self.target.id_ref
    }

    /// q current reference resolved by the last `calc`.
    pub fn get_iq_ref(&self) -> f64 {
        self.iq_ref_internal
    }

    /// Speed reference resolved by the last `calc`.
    pub fn get_vel_ref(&self) -> f64 {
        self.vel_ref_internal
    }
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_first_call() {
        let mut ctrl = LoopController::new();
        ctrl.set_velocity_loop_enabled(true);
        ctrl.set_position_loop_enabled(false);
        ctrl.set_target(ControlTarget { vel_ref: 100.0, ..ControlTarget::new() });

        let state = MotorState::default();
        let out = ctrl.calc(&state, 1e-4);

        assert!((ctrl.get_iq_ref() - 70.88).abs() < 1e-6);
        assert_eq!(ctrl.get_vel_ref(), 100.0);
        assert_eq!(out.vel_ref, 100.0);
        // q voltage saturates at the bus
        assert_eq!(out.iq_ref, 24.0);
    }

    #[test]
    fn test_reset_to_default() {
        let mut ctrl = LoopController::new();
        ctrl.set_target(ControlTarget { vel_ref: -3.0, pos_ref: 1.0, ..ControlTarget::new() });
        ctrl.set_position_loop_enabled(true);
        ctrl.set_velocity_pid(PidParams::new(9.0, 9.0, 0.0, 1.0, -1.0, 1.0)).unwrap();

        ctrl.reset_to_default();

        assert_eq!(ctrl.get_target().vel_ref, 100.0);
        assert!(!ctrl.is_position_loop_enabled());
        assert_eq!(ctrl.get_vel_pid(), PidParams::default_velocity());
    }

    #[test]
    fn test_disabled_loops_pass_through() {
        let mut ctrl = LoopController::new();
        ctrl.set_velocity_loop_enabled(false);
        ctrl.set_target(ControlTarget { id_ref: 0.0, iq_ref: 5.0, vel_ref: 42.0, pos_ref: 0.5 });

        let out = ctrl.calc(&MotorState::default(), 1e-4);
        assert_eq!(ctrl.get_iq_ref(), 5.0);
        assert_eq!(out.vel_ref, 42.0);
        assert_eq!(out.pos_ref, 0.5);
        assert!(out.iq_ref > 0.0);
        assert_eq!(out.id_ref, 0.0);

        ctrl.set_current_loop_enabled(false);
        let out = ctrl.calc(&MotorState::default(), 1e-4);
        assert_eq!((out.id_ref, out.iq_ref), (0.0, 0.0));
    }

    #[test]
    fn test_position_loop_drives_velocity() {
        let mut ctrl = LoopController::new();
        ctrl.set_position_loop_enabled(true);
        ctrl.set_target(ControlTarget { pos_ref: 1.0, ..ControlTarget::new() });

        let state = MotorState { theta_e: 0.25, ..MotorState::default() };
        let out = ctrl.calc(&state, 1e-4);

        let kp = ctrl.get_pos_pid().kp;
        assert!((out.vel_ref - kp * 0.75).abs() < 1e-9);
        assert_eq!(ctrl.get_vel_ref(), out.vel_ref);
    }

    #[test]
    fn test_rejects_inverted_current_pid() {
        let mut ctrl = LoopController::new();
        let before = ctrl.get_id_pid();
        let bad = PidParams::new(1.0, 1.0, 0.0, -10.0, 10.0, 1.0);
        assert!(ctrl.set_current_pid(bad, bad).is_err());
        assert_eq!(ctrl.get_id_pid(), before);
    }
}

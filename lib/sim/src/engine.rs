use std::sync::mpsc::Receiver;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use config::{ConfigData, ConfigError, MotorParams, MotorState, SimConfig, DEFAULT_BUS_VOLTAGE};
use foc::cascade::LoopController;
use foc::drive::{commutate, ControlMode, DriveOutput, PipelineStage};
use foc::foc::FieldOrientedControl;
use foc::six_step::SixStepController;
use foc::svm::SvpwmOutput;
use foc::transforms::Dq;
use motor::{HallState, MotorModel};

use crate::events::{EventBus, SimEvent};

/// Period of the external tick that drives `on_frame`, ~60 Hz.
pub const FRAME_PERIOD: Duration = Duration::from_millis(16);

/// Upper bound on integration ticks per frame.
pub const MAX_STEPS_PER_FRAME: usize = 10000;

/// State emissions per frame burst, the final one included.
const EMISSIONS_PER_FRAME: usize = 8;

/// Load torque applied to the shaft until changed, N m.
pub const DEFAULT_LOAD_TORQUE: f64 = 0.2;

/// Runs the control pipeline against a motor model at a fixed step.
///
/// The engine owns the plant and both controllers. Anything not attached is
/// skipped: without a model `start`, `step` and `on_frame` do nothing, and
/// without a controller for the selected mode the model sees zero voltage.
pub struct SimEngine {
    motor: Option<Box<dyn MotorModel>>,
    loop_ctrl: Option<LoopController>,
    six_step: Option<SixStepController>,
    foc: FieldOrientedControl,

    config: SimConfig,
    mode: ControlMode,
    udc: f64,
    load_torque: f64,

    svpwm_out: SvpwmOutput,
    hall: HallState,
    step_index: u64,

    events: EventBus,
}

impl SimEngine {
    pub fn new() -> SimEngine {
        SimEngine {
            motor: None,
            loop_ctrl: None,
            six_step: None,
            foc: FieldOrientedControl::new(),
            config: SimConfig::new(),
            mode: ControlMode::Foc,
            udc: DEFAULT_BUS_VOLTAGE,
            load_torque: DEFAULT_LOAD_TORQUE,
            svpwm_out: SvpwmOutput::default(),
            hall: HallState::default(),
            step_index: 0,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SimEvent> {
        self.events.subscribe()
    }

    pub fn start(&mut self) {
        if self.motor.is_none() {
            debug!("start ignored, no motor model attached");
            return;
        }
        self.config.running = true;
        debug!("simulation started at step {}", self.step_index);
    }

    pub fn stop(&mut self) {
        self.config.running = false;
        debug!("simulation stopped at step {}", self.step_index);
    }

    pub fn pause(&mut self) {
        self.config.running = false;
        debug!("simulation paused at step {}", self.step_index);
    }

    pub fn is_running(&self) -> bool {
        self.config.running
    }

    /// One tick with per-stage notifications, hall state and a completion
    /// event, whether or not the engine is running.
    pub fn step(&mut self) {
        if self.motor.is_none() {
            return;
        }
        self.config.single_step = true;
        self.execute_one_step();
        self.config.single_step = false;
    }

    /// Stops the engine and brings the model, the controllers and the
    /// derived outputs back to their initial state.
    pub fn reset(&mut self) {
        self.stop();

        if let Some(motor) = self.motor.as_mut() {
            motor.reset();
        }
        if let Some(ctrl) = self.six_step.as_mut() {
            ctrl.reset();
        }
        if let Some(ctrl) = self.loop_ctrl.as_mut() {
            ctrl.reset();
        }

        self.foc = FieldOrientedControl::new();
        self.step_index = 0;
        self.svpwm_out = SvpwmOutput::default();
        self.hall = HallState::default();

        debug!("simulation reset");
        let state = self.get_state().unwrap_or_default();
        self.events.publish(SimEvent::StateUpdated(state));
    }

    /// Ticks executed per frame at the current step and speed ratio.
    pub fn steps_per_frame(&self) -> usize {
        let steps = FRAME_PERIOD.as_secs_f64() / self.config.dt * self.config.speed_ratio;
        // saturating cast, NaN lands on 0
        (steps.floor() as usize).clamp(1, MAX_STEPS_PER_FRAME)
    }

    /// External tick callback. Runs a frame's worth of ticks and emits the
    /// state about eight times along the way, the last emission after the
    /// final tick. Returns the number of ticks executed.
    pub fn on_frame(&mut self) -> usize {
        if !self.config.running || self.motor.is_none() {
            return 0;
        }

        let steps = self.steps_per_frame();
        let emit_every = (steps / EMISSIONS_PER_FRAME).max(1);

        let mut executed = 0;
        while executed < steps && self.config.running {
            self.execute_one_step();
            executed += 1;

            if executed % emit_every == 0 && executed < steps {
                self.emit_state();
            }
        }
        self.emit_state();

        trace!("frame of {} steps, now at step {}", executed, self.step_index);
        executed
    }

    /// Load torque, control law, plant step. In single step mode also
    /// reports every pipeline stage and the hall state.
    pub fn execute_one_step(&mut self) {
        let Some(motor) = self.motor.as_mut() else {
            return;
        };

        let detailed = self.config.single_step;
        let dt = self.config.dt;
        let udc = self.udc;

        let events = &mut self.events;
        let mut on_stage = |stage: PipelineStage| {
            if detailed {
                events.publish(SimEvent::StageChanged(stage));
            }
        };

        motor.set_load_torque(self.load_torque);
        let state = motor.get_state();

        let output = match self.mode {
            ControlMode::Foc => self
                .loop_ctrl
                .as_mut()
                .map(|ctrl| self.foc.update(ctrl, &state, dt, udc, &mut on_stage)),
            ControlMode::SixStep => {
                let vel_ref = self.loop_ctrl.as_ref().map_or(0.0, |ctrl| ctrl.get_target().vel_ref);
                self.six_step
                    .as_mut()
                    .map(|ctrl| commutate(ctrl, &state, vel_ref, dt, udc, &mut on_stage))
            }
        };

        let voltage = match output {
            Some(DriveOutput { voltage, pwm }) => {
                self.svpwm_out = pwm;
                voltage
            }
            None => Dq::new(0.0, 0.0),
        };

        on_stage(PipelineStage::MotorModel);
        motor.set_voltage(voltage.d, voltage.q);
        motor.step(dt);
        self.step_index += 1;

        let state = motor.get_state();
        if detailed || self.mode == ControlMode::SixStep {
            self.hall = HallState::from_electrical_angle(state.theta_e);
        }

        if detailed {
            self.events.publish(SimEvent::StepCompleted {
                index: self.step_index,
                label: format!("Step {}", self.step_index),
            });
            self.events.publish(SimEvent::HallStateChanged(self.hall));
            self.events.publish(SimEvent::StateUpdated(state));
        }
    }

    fn emit_state(&mut self) {
        if let Some(state) = self.get_state() {
            self.events.publish(SimEvent::StateUpdated(state));
        }
    }

    /// Takes the integration step and speed ratio; the run flags stay as
    /// they are.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!("rejected simulation config: {}", e);
            return Err(e);
        }
        self.config = SimConfig {
            running: self.config.running,
            single_step: self.config.single_step,
            ..config
        };
        debug!("dt {} s, speed ratio {}", self.config.dt, self.config.speed_ratio);
        Ok(())
    }

    pub fn get_config(&self) -> SimConfig {
        self.config
    }

    pub fn set_speed_ratio(&mut self, speed_ratio: f64) -> Result<(), ConfigError> {
        self.set_config(SimConfig { speed_ratio, ..self.config })
    }

    /// Replaces the plant. The model's parameters are checked first and a
    /// rejected model is dropped.
    pub fn set_motor_model(&mut self, model: Box<dyn MotorModel>) -> Result<(), ConfigError> {
        if let Err(e) = model.get_params().validate() {
            warn!("rejected {} model: {}", model.motor_type().name(), e);
            return Err(e);
        }
        debug!("motor model set to {}", model.motor_type().name());
        self.motor = Some(model);
        Ok(())
    }

    /// Detaches the plant, stopping the engine.
    pub fn take_motor_model(&mut self) -> Option<Box<dyn MotorModel>> {
        self.stop();
        self.motor.take()
    }

    pub fn motor_model(&self) -> Option<&dyn MotorModel> {
        self.motor.as_deref()
    }

    pub fn motor_model_mut(&mut self) -> Option<&mut (dyn MotorModel + 'static)> {
        self.motor.as_deref_mut()
    }

    pub fn set_motor_params(&mut self, params: MotorParams) -> Result<(), ConfigError> {
        if let Err(e) = params.validate() {
            warn!("rejected motor parameters: {}", e);
            return Err(e);
        }
        if let Some(motor) = self.motor.as_mut() {
            motor.set_params(params);
        }
        Ok(())
    }

    pub fn set_loop_controller(&mut self, ctrl: LoopController) {
        self.loop_ctrl = Some(ctrl);
    }

    pub fn loop_controller(&self) -> Option<&LoopController> {
        self.loop_ctrl.as_ref()
    }

    pub fn loop_controller_mut(&mut self) -> Option<&mut LoopController> {
        self.loop_ctrl.as_mut()
    }

    pub fn set_six_step_controller(&mut self, ctrl: SixStepController) {
        self.six_step = Some(ctrl);
    }

    pub fn six_step_controller(&self) -> Option<&SixStepController> {
        self.six_step.as_ref()
    }

    pub fn six_step_controller_mut(&mut self) -> Option<&mut SixStepController> {
        self.six_step.as_mut()
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            debug!("control mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn get_control_mode(&self) -> ControlMode {
        self.mode
    }

    pub fn set_load_torque(&mut self, tl: f64) {
        self.load_torque = tl;
    }

    pub fn get_load_torque(&self) -> f64 {
        self.load_torque
    }

    pub fn set_bus_voltage(&mut self, udc: f64) -> Result<(), ConfigError> {
        if !udc.is_finite() {
            return Err(ConfigError::NotFinite { name: "bus_voltage" });
        }
        if udc <= 0.0 {
            return Err(ConfigError::NonPositive { name: "bus_voltage", value: udc });
        }
        self.udc = udc;
        Ok(())
    }

    pub fn get_bus_voltage(&self) -> f64 {
        self.udc
    }

    /// Loads a full parameter bundle: pauses, pushes every record to its
    /// owner and resets. Nothing is applied if any record is invalid.
    pub fn apply_config(&mut self, data: &ConfigData) -> Result<(), ConfigError> {
        if let Err(e) = data.validate() {
            warn!("rejected config bundle: {}", e);
            return Err(e);
        }

        self.pause();
        self.set_motor_params(data.motor)?;
        self.set_config(data.sim)?;

        if let Some(ctrl) = self.loop_ctrl.as_mut() {
            ctrl.set_current_pid(data.current_pid, data.current_pid)?;
            ctrl.set_velocity_pid(data.velocity_pid)?;
            ctrl.set_position_pid(data.position_pid)?;
            ctrl.set_target(data.target);
        }
        if let (Some(params), Some(ctrl)) = (data.six_step, self.six_step.as_mut()) {
            ctrl.set_params(params)?;
        }

        info!(
            "config applied: dt {} s, {} pole pairs, velocity target {} rad/s",
            data.sim.dt, data.motor.pole_pairs, data.target.vel_ref
        );
        self.reset();
        Ok(())
    }

    /// Default motor parameters, step and gains, then a reset.
    pub fn restore_defaults(&mut self) {
        self.pause();
        if let Some(motor) = self.motor.as_mut() {
            motor.set_params(MotorParams::new());
        }
        self.config = SimConfig::new();
        if let Some(ctrl) = self.loop_ctrl.as_mut() {
            ctrl.reset_to_default();
        }
        if let Some(ctrl) = self.six_step.as_mut() {
            ctrl.reset_to_default();
        }
        info!("defaults restored");
        self.reset();
    }

    pub fn get_state(&self) -> Option<MotorState> {
        self.motor.as_ref().map(|motor| motor.get_state())
    }

    /// Last modulator output. In six-step mode `sector` is the commutation
    /// sector of the advanced angle; the rotor sector is in `get_hall_state`.
    pub fn get_svpwm_output(&self) -> SvpwmOutput {
        self.svpwm_out
    }

    pub fn get_hall_state(&self) -> HallState {
        self.hall
    }

    pub fn get_step_index(&self) -> u64 {
        self.step_index
    }

    /// Simulated time since the last reset, s.
    pub fn get_sim_time(&self) -> f64 {
        self.step_index as f64 * self.config.dt
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

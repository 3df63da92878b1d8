use config::{ConfigError, PidParams};

/// Single axis PID with integral clamp and output saturation.
///
/// The integral accumulates `error * dt` and is held within
/// `±integral_max`; the derivative acts on the error. Callers guarantee
/// `dt > 0`.
#[derive(Debug, Clone, Copy)]
pub struct PidController {
    params: PidParams,
    integral: f64,
    prev_error: f64,
}

impl PidController {
    pub fn new(params: PidParams) -> PidController {
        PidController {
            params,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    pub fn calc(&mut self, target: f64, feedback: f64, dt: f64) -> f64 {
        let p = &self.params;
        let error = target - feedback;

        self.integral = (self.integral + error * dt)
            .max(-p.integral_max)
            .min(p.integral_max);

        let derivative = (error - self.prev_error) / dt;
        self.prev_error = error;

        (p.kp * error + p.ki * self.integral + p.kd * derivative)
            .max(p.out_min)
            .min(p.out_max)
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Swaps the gains, keeping the integrator.
    pub fn set_params(&mut self, params: PidParams) {
        self.params = params;
    }

    pub fn try_set_params(&mut self, params: PidParams, name: &'static str) -> Result<(), ConfigError> {
        params.validate(name)?;
        self.params = params;
        Ok(())
    }

    pub fn get_params(&self) -> PidParams {
        self.params
    }

    pub fn get_integral(&self) -> f64 {
        self.integral
    }

    pub fn get_last_error(&self) -> f64 {
        self.prev_error
    }
}

impl Default for PidController {
    fn default() -> Self {
        PidController::new(PidParams::default())
    }
}

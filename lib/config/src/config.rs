use core::f64::consts::TAU;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bus voltage of the reference drive, in volts.
pub const DEFAULT_BUS_VOLTAGE: f64 = 24.0;

/// Current loop bandwidth used for the IMC default gains, in Hz.
pub const CURRENT_BANDWIDTH_HZ: f64 = 2000.0;

/// Velocity loop bandwidth sits this factor below the current loop.
pub const VELOCITY_BANDWIDTH_RATIO: f64 = 20.0;

/// Position loop bandwidth sits this factor below the velocity loop.
pub const POSITION_BANDWIDTH_RATIO: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct MotorParams {
    pub rs: f64,         // stator resistance, ohm
    pub ld: f64,         // d-axis inductance, H
    pub lq: f64,         // q-axis inductance, H
    pub psi_f: f64,      // permanent magnet flux linkage, Wb
    pub j: f64,          // rotor inertia, kg m^2
    pub b: f64,          // viscous damping, N m s / rad
    pub pole_pairs: u32,
}

impl MotorParams {
    /// 500 W class drive motor.
    pub fn new() -> Self {
        MotorParams {
            rs: 0.3,
            ld: 0.001,
            lq: 0.001,
            psi_f: 0.15,
            j: 0.001,
            b: 0.0001,
            pole_pairs: 4,
        }
    }

    /// Torque constant for a surface magnet machine, N m / A.
    pub fn torque_constant(&self) -> f64 {
        1.5 * self.pole_pairs as f64 * self.psi_f
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("motor.ld", self.ld)?;
        positive("motor.lq", self.lq)?;
        positive("motor.j", self.j)?;
        non_negative("motor.rs", self.rs)?;
        non_negative("motor.b", self.b)?;
        non_negative("motor.psi_f", self.psi_f)?;
        if self.pole_pairs == 0 {
            return Err(ConfigError::ZeroPolePairs);
        }
        Ok(())
    }
}

impl Default for MotorParams {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PidParams {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub out_max: f64,
    pub out_min: f64,
    pub integral_max: f64,
}

impl PidParams {
    pub fn new(kp: f64, ki: f64, kd: f64, out_max: f64, out_min: f64, integral_max: f64) -> Self {
        PidParams { kp, ki, kd, out_max, out_min, integral_max }
    }

    /// Internal model control tuning of a dq current loop: the closed loop
    /// behaves as a first order lag with the given bandwidth.
    /// Output is limited to the bus voltage and the integral is sized so the
    /// integral term alone can reach the limit.
    pub fn imc_current(motor: &MotorParams, bus_voltage: f64) -> Self {
        let omega_c = TAU * CURRENT_BANDWIDTH_HZ;
        let kp = motor.ld * omega_c;
        let ki = motor.rs * omega_c;

        PidParams {
            kp,
            ki,
            kd: 0.0,
            out_max: bus_voltage,
            out_min: -bus_voltage,
            integral_max: if ki > 0.0 { bus_voltage / ki } else { 1.0 },
        }
    }

    /// Velocity loop at a twentieth of the current bandwidth.
    /// Kp = J * wv / Kt and Ki = Kp * wv / 5, rounded for the default motor.
    pub fn default_velocity() -> Self {
        PidParams::new(0.7, 88.0, 0.0, 80.0, -80.0, 1.0)
    }

    /// Position loop at a fifth of the velocity bandwidth. The loop closes
    /// on electrical angle and commands mechanical speed, hence the division
    /// by the pole pair count.
    pub fn imc_position(motor: &MotorParams) -> Self {
        let omega_v = TAU * CURRENT_BANDWIDTH_HZ / VELOCITY_BANDWIDTH_RATIO;
        let omega_p = omega_v / POSITION_BANDWIDTH_RATIO;
        let kp = omega_p / motor.pole_pairs.max(1) as f64;

        PidParams::new(kp, 0.0, 0.0, 200.0, -200.0, 1.0)
    }

    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        for value in [self.kp, self.ki, self.kd, self.out_max, self.out_min, self.integral_max] {
            finite(name, value)?;
        }
        if self.out_min > self.out_max {
            return Err(ConfigError::InvertedBounds {
                name,
                out_min: self.out_min,
                out_max: self.out_max,
            });
        }
        if self.integral_max <= 0.0 {
            return Err(ConfigError::NonPositive { name, value: self.integral_max });
        }
        Ok(())
    }
}

impl Default for PidParams {
    fn default() -> Self {
        PidParams::new(1.0, 0.0, 0.0, 100.0, -100.0, 50.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ControlTarget {
    pub id_ref: f64,  // A
    pub iq_ref: f64,  // A
    pub vel_ref: f64, // mechanical rad/s
    pub pos_ref: f64, // electrical rad
}

impl ControlTarget {
    pub fn new() -> Self {
        ControlTarget {
            id_ref: 0.0,
            iq_ref: 0.0,
            vel_ref: 100.0,
            pos_ref: 0.0,
        }
    }
}

impl Default for ControlTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SimConfig {
    pub dt: f64,          // integration step, s
    pub speed_ratio: f64, // simulated seconds per wall clock second
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub single_step: bool,
}

impl SimConfig {
    pub fn new() -> Self {
        SimConfig {
            dt: 100e-6,
            speed_ratio: 1.0,
            running: false,
            single_step: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sim.dt", self.dt)?;
        non_negative("sim.speed_ratio", self.speed_ratio)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SixStepParams {
    pub kp: f64,
    pub ki: f64,
    pub integral_max: f64,
}

impl SixStepParams {
    pub fn new() -> Self {
        SixStepParams {
            kp: 0.01,
            ki: 0.1,
            integral_max: 0.8,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("six_step.kp", self.kp)?;
        finite("six_step.ki", self.ki)?;
        positive("six_step.integral_max", self.integral_max)
    }
}

impl Default for SixStepParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything an external loader hands over in one go.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ConfigData {
    pub motor: MotorParams,
    pub sim: SimConfig,
    pub current_pid: PidParams,
    pub velocity_pid: PidParams,
    pub position_pid: PidParams,
    pub target: ControlTarget,
    #[serde(default)]
    pub six_step: Option<SixStepParams>,
}

impl ConfigData {
    pub fn new() -> Self {
        let motor = MotorParams::new();
        ConfigData {
            motor,
            sim: SimConfig::new(),
            current_pid: PidParams::imc_current(&motor, DEFAULT_BUS_VOLTAGE),
            velocity_pid: PidParams::default_velocity(),
            position_pid: PidParams::imc_position(&motor),
            target: ControlTarget::new(),
            six_step: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motor.validate()?;
        self.sim.validate()?;
        self.current_pid.validate("current_pid")?;
        self.velocity_pid.validate("velocity_pid")?;
        self.position_pid.validate("position_pid")?;
        if let Some(six_step) = &self.six_step {
            six_step.validate()?;
        }
        Ok(())
    }
}

impl Default for ConfigData {
    fn default() -> Self {
        Self::new()
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { name })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

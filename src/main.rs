use std::env;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::ConfigData;
use foc::cascade::LoopController;
use foc::drive::ControlMode;
use foc::six_step::SixStepController;
use motor::{create_with_params, MotorType};
use sim::scope::{Channel, Scope};
use sim::{FramePacer, SimEngine, SimEvent, FRAME_PERIOD};

// ~1 s of frames between progress lines
const REPORT_EVERY: usize = 60;

// eight states per frame, about a second of history
const SCOPE_DEPTH: usize = 512;

struct Args {
    mode: ControlMode,
    motor: MotorType,
    seconds: f64,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        mode: ControlMode::Foc,
        motor: MotorType::Pmsm,
        seconds: 3.0,
    };

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "foc" => args.mode = ControlMode::Foc,
            "six-step" => args.mode = ControlMode::SixStep,
            "pmsm" => args.motor = MotorType::Pmsm,
            "bldc" => args.motor = MotorType::Bldc,
            other => {
                args.seconds = other
                    .parse()
                    .map_err(|_| format!("usage: foc-sim [foc|six-step] [pmsm|bldc] [seconds], got {:?}", other))?;
            }
        }
    }
    Ok(args)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let data = ConfigData::new();
    let model = match create_with_params(args.motor, data.motor) {
        Ok(Some(model)) => model,
        Ok(None) => {
            error!("no model for {}", args.motor.name());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("bad motor parameters: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut engine = SimEngine::new();
    engine.set_loop_controller(LoopController::new());
    engine.set_six_step_controller(SixStepController::new());
    if let Err(e) = engine.set_motor_model(model).and_then(|_| engine.apply_config(&data)) {
        error!("failed to configure engine: {}", e);
        return ExitCode::FAILURE;
    }
    engine.set_control_mode(args.mode);

    let events = engine.subscribe();
    let mut scope = Scope::<SCOPE_DEPTH>::new(&[Channel::Iq, Channel::OmegaM, Channel::Te]);
    let mut scope_bytes = 0;
    let mut frame_buf = [0u8; sim::scope::MAX_SAMPLE_LEN];

    let frames = (args.seconds / FRAME_PERIOD.as_secs_f64()).ceil() as usize;
    info!(
        "running {} under {:?} control for {} s ({} frames of {} steps)",
        args.motor.name(),
        args.mode,
        args.seconds,
        frames,
        engine.steps_per_frame()
    );

    let mut pacer = FramePacer::default();
    engine.start();

    for frame in 1..=frames {
        pacer.run(&mut engine, 1);

        for event in events.try_iter() {
            if let SimEvent::StateUpdated(state) = event {
                let sample = scope.tick(
                    engine.get_step_index(),
                    &state,
                    &engine.get_svpwm_output(),
                    &engine.get_hall_state(),
                );
                match sample.encode_into(&mut frame_buf) {
                    Ok(length) => scope_bytes += length,
                    Err(e) => error!("failed to encode scope sample: {}", e),
                }
            }
        }

        if frame % REPORT_EVERY == 0 {
            if let Some(state) = engine.get_state() {
                let (iq_min, iq_max) = scope
                    .trace(Channel::Iq)
                    .and_then(|t| t.min_max())
                    .unwrap_or_default();
                info!(
                    "t={:.3} s omega_m={:.2} rad/s iq={:.3} A ({:.3}..{:.3}) te={:.3} N m sector={}",
                    engine.get_sim_time(),
                    state.omega_m,
                    state.iq,
                    iq_min,
                    iq_max,
                    state.te,
                    engine.get_svpwm_output().sector,
                );
            }
        }
    }

    engine.stop();
    info!(
        "done after {} steps, {} frames overran, {} scope bytes",
        engine.get_step_index(),
        pacer.get_overruns(),
        scope_bytes
    );
    ExitCode::SUCCESS
}

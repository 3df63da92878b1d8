use bincode::config::{Configuration, LittleEndian, NoLimit, Varint};
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use heapless::HistoryBuffer;

use config::MotorState;
use foc::svm::SvpwmOutput;
use motor::HallState;

pub static BINCODE_CFG: Configuration<LittleEndian, Varint, NoLimit> = bincode::config::standard()
    .with_little_endian()
    .with_variable_int_encoding();

/// Upper bound of an encoded `ScopeSample`.
pub const MAX_SAMPLE_LEN: usize = 256;

/// Motor state quantities a trace can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Channel {
    Ia,
    Ib,
    Ic,
    Id,
    Iq,
    Ud,
    Uq,
    ThetaE,
    OmegaM,
    Te,
}

impl Channel {
    pub fn read(&self, state: &MotorState) -> f64 {
        match self {
            Channel::Ia => state.ia,
            Channel::Ib => state.ib,
            Channel::Ic => state.ic,
            Channel::Id => state.id,
            Channel::Iq => state.iq,
            Channel::Ud => state.ud,
            Channel::Uq => state.uq,
            Channel::ThetaE => state.theta_e,
            Channel::OmegaM => state.omega_m,
            Channel::Te => state.te,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Ia => "ia",
            Channel::Ib => "ib",
            Channel::Ic => "ic",
            Channel::Id => "id",
            Channel::Iq => "iq",
            Channel::Ud => "ud",
            Channel::Uq => "uq",
            Channel::ThetaE => "theta_e",
            Channel::OmegaM => "omega_m",
            Channel::Te => "te",
        }
    }
}

/// Last `N` samples of one channel.
#[derive(Debug, Clone)]
pub struct Trace<const N: usize> {
    channel: Channel,
    samples: HistoryBuffer<f64, N>,
}

impl<const N: usize> Trace<N> {
    pub fn new(channel: Channel) -> Trace<N> {
        Trace {
            channel,
            samples: HistoryBuffer::new(),
        }
    }

    pub fn record(&mut self, state: &MotorState) {
        self.samples.write(self.channel.read(state));
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.recent().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.len() == 0
    }

    /// Oldest sample first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.oldest_ordered().copied()
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.iter().fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// One scope frame as sent to a plotting client.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct ScopeSample {
    pub id: u32,
    pub step: u64,
    pub state: MotorState,
    pub pwm: SvpwmOutput,
    pub hall_code: u8,
}

impl ScopeSample {
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        bincode::encode_into_slice(self, buf, BINCODE_CFG)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = vec![0; MAX_SAMPLE_LEN];
        let length = self.encode_into(&mut buf)?;
        buf.truncate(length);
        Ok(buf)
    }

    /// Decodes one frame; trailing bytes are an error.
    pub fn decode(buf: &[u8]) -> Result<ScopeSample, DecodeError> {
        let (sample, length) = bincode::decode_from_slice(buf, BINCODE_CFG)?;
        if length != buf.len() {
            return Err(DecodeError::Other("trailing bytes after scope sample"));
        }
        Ok(sample)
    }
}

/// A set of traces fed from engine state, numbering the samples it hands out.
#[derive(Debug, Clone)]
pub struct Scope<const N: usize> {
    traces: Vec<Trace<N>>,
    sample_id: u32,
}

impl<const N: usize> Scope<N> {
    pub fn new(channels: &[Channel]) -> Scope<N> {
        Scope {
            traces: channels.iter().map(|c| Trace::new(*c)).collect(),
            sample_id: 0,
        }
    }

    pub fn tick(&mut self, step: u64, state: &MotorState, pwm: &SvpwmOutput, hall: &HallState) -> ScopeSample {
        for trace in self.traces.iter_mut() {
            trace.record(state);
        }

        let sample = ScopeSample {
            id: self.sample_id,
            step,
            state: *state,
            pwm: *pwm,
            hall_code: hall.hall_code,
        };
        self.sample_id = self.sample_id.wrapping_add(1);
        sample
    }

    pub fn trace(&self, channel: Channel) -> Option<&Trace<N>> {
        self.traces.iter().find(|t| t.channel() == channel)
    }

    pub fn traces(&self) -> &[Trace<N>] {
        &self.traces
    }

    pub fn clear(&mut self) {
        for trace in self.traces.iter_mut() {
            trace.clear();
        }
        self.sample_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(iq: f64, omega_m: f64) -> MotorState {
        MotorState { iq, omega_m, ..MotorState::default() }
    }

    #[test]
    fn test_trace_keeps_latest() {
        let mut trace = Trace::<4>::new(Channel::Iq);
        assert!(trace.is_empty());
        assert_eq!(trace.min_max(), None);

        for i in 0..6 {
            trace.record(&state(i as f64, 0.0));
        }

        assert_eq!(trace.len(), 4);
        assert_eq!(trace.latest(), Some(5.0));
        assert_eq!(trace.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(trace.min_max(), Some((2.0, 5.0)));
    }

    #[test]
    fn test_scope_numbers_samples() {
        let mut scope = Scope::<16>::new(&[Channel::Iq, Channel::OmegaM]);
        let pwm = SvpwmOutput::default();
        let hall = HallState::from_electrical_angle(0.5);

        let first = scope.tick(10, &state(1.0, 2.0), &pwm, &hall);
        let second = scope.tick(20, &state(3.0, 4.0), &pwm, &hall);

        assert_eq!((first.id, second.id), (0, 1));
        assert_eq!(second.step, 20);
        assert_eq!(second.hall_code, 5);
        assert_eq!(scope.trace(Channel::OmegaM).and_then(|t| t.latest()), Some(4.0));
        assert!(scope.trace(Channel::Te).is_none());

        scope.clear();
        assert!(scope.traces().iter().all(|t| t.is_empty()));
    }

    #[test]
    fn test_sample_frame() {
        let mut scope = Scope::<8>::new(&[]);
        let s = MotorState {
            theta_e: 1.25,
            iq: -3.5,
            ua: 12.0,
            ..MotorState::default()
        };
        let pwm = SvpwmOutput { ta: 0.25, tb: 0.5, tc: 0.75, sector: 2, mag: 3.0, angle: 1.0 };
        let sample = scope.tick(123456, &s, &pwm, &HallState::from_electrical_angle(s.theta_e));

        let bytes = sample.to_bytes().unwrap();
        assert!(bytes.len() <= MAX_SAMPLE_LEN);
        assert_eq!(ScopeSample::decode(&bytes).unwrap(), sample);

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(ScopeSample::decode(&padded).is_err());
        assert!(ScopeSample::decode(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let sample = Scope::<1>::new(&[]).tick(0, &MotorState::default(), &SvpwmOutput::default(), &HallState::default());
        let mut buf = [0u8; 16];
        assert!(sample.encode_into(&mut buf).is_err());
    }
}

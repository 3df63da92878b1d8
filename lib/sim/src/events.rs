use std::sync::mpsc::{channel, Receiver, Sender};

use config::MotorState;
use foc::drive::PipelineStage;
use motor::HallState;

/// Notifications published by the engine. Within one tick stage changes come
/// first, in pipeline order, and `StateUpdated` comes last.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    StateUpdated(MotorState),
    StepCompleted { index: u64, label: String },
    StageChanged(PipelineStage),
    HallStateChanged(HallState),
}

/// Fan-out to any number of subscribers. Dropped receivers are pruned on the
/// next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SimEvent>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus { subscribers: Vec::new() }
    }

    pub fn subscribe(&mut self) -> Receiver<SimEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: SimEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use crate::hook::{ExitReason, HookModel, HookPhase};
use crate::resolver::ModeScope;

/// Channel to publish invocation events for auditing
#[derive(Debug, Clone)]
pub struct InvocationEventChannel {
    pub channel_id: Arc<String>,
    pub sender: mpsc::UnboundedSender<InvocationEvent>,
}

impl InvocationEventChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InvocationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let channel_id = Uuid::new_v4().to_string();

        (Self { channel_id: Arc::new(channel_id), sender }, receiver)
    }

    /// Nobody listening is not an error; events are best-effort.
    pub fn emit(&self, invocation_id: Uuid, kind: InvocationEventKind) {
        let event = InvocationEvent {
            id: Uuid::new_v4(),
            invocation_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind,
        };
        if self.sender.send(event).is_err() {
            log::trace!("Invocation event dropped, receiver closed");
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationEvent {
    pub id: Uuid,
    pub invocation_id: Uuid,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub kind: InvocationEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationEventKind {
    // Lifecycle
    InvocationStarted {
        script: String,
    },
    ModeResolved {
        mode: String,
        scope: ModeScope,
    },
    InvocationCompleted {
        exit_code: i32,
        reason: ExitReason,
        duration_ms: u64,
    },

    // Hooks
    HookFired {
        hook: String,
        phase: HookPhase,
        model: HookModel,
    },
    HookFailed {
        hook: String,
        message: String,
    },
    ContractApplied {
        hook: String,
        directive: String,
    },
    Terminated {
        hook: String,
        exit_code: i32,
        reason: ExitReason,
    },

    // Wrapped action
    ActionStarted {
        command: String,
        dry_run: bool,
    },
    ActionCompleted {
        exit_code: i32,
        duration_ms: u64,
    },
    ActionSkipped,

    // Deadline
    TimeoutArmed {
        seconds: u64,
    },
    TimeoutFired {
        seconds: u64,
    },
    TimeoutCancelled,
}

impl InvocationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            InvocationEventKind::Terminated { .. } | InvocationEventKind::TimeoutFired { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_carry_the_invocation_id() {
        let (channel, mut receiver) = InvocationEventChannel::new();
        let invocation = Uuid::new_v4();

        channel.emit(invocation, InvocationEventKind::TimeoutArmed { seconds: 3 });
        channel.emit(invocation, InvocationEventKind::TimeoutFired { seconds: 3 });

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert_eq!(first.invocation_id, invocation);
        assert!(!first.is_terminal());
        assert!(second.is_terminal());
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn emitting_without_receiver_is_harmless() {
        let (channel, receiver) = InvocationEventChannel::new();
        drop(receiver);
        channel.emit(Uuid::new_v4(), InvocationEventKind::ActionSkipped);
    }
}

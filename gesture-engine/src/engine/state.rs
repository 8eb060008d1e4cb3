//! Engine state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mode the engine is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineState {
    /// Main menu
    #[default]
    Idle,
    /// A recording target is set, waiting for the trigger
    ReadyToRecord,
    /// Trigger held, capturing an example
    Recording,
    /// A classifier is training in the background
    Training,
    /// Classifying paths as they are performed
    Detecting,
}

/// Inputs that move the engine between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    EnterRecordingTarget,
    ContactEngaged,
    ContactReleased,
    LeaveToMainMenu,
    BeginTraining,
    TrainingCompleted,
    TrainingAborted,
    BeginDetect,
    EndDetect,
}

impl EngineState {
    /// Next state for `trigger`, or `None` if the pair is not allowed.
    ///
    /// Contact edges while detecting are handled by the engine without a
    /// state change and are not part of this table.
    pub fn transition(self, trigger: Trigger) -> Option<EngineState> {
        use EngineState::*;
        use Trigger::*;

        match (self, trigger) {
            (Idle, EnterRecordingTarget) => Some(ReadyToRecord),
            (ReadyToRecord, ContactEngaged) => Some(Recording),
            (Recording, ContactReleased) => Some(ReadyToRecord),
            (ReadyToRecord | Idle, LeaveToMainMenu) => Some(Idle),
            (Idle, BeginTraining) => Some(Training),
            (Training, TrainingCompleted | TrainingAborted) => Some(Idle),
            (Idle, BeginDetect) => Some(Detecting),
            (Detecting, EndDetect) => Some(Idle),
            _ => None,
        }
    }

    /// Like [`transition`](Self::transition) but failing with `InvalidTransition`
    pub fn next(self, trigger: Trigger) -> crate::Result<EngineState> {
        self.transition(trigger)
            .ok_or(crate::Error::InvalidTransition {
                state: self,
                trigger,
            })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::ReadyToRecord => "ready to record",
            EngineState::Recording => "recording",
            EngineState::Training => "training",
            EngineState::Detecting => "detecting",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::EnterRecordingTarget => "enter recording target",
            Trigger::ContactEngaged => "contact engaged",
            Trigger::ContactReleased => "contact released",
            Trigger::LeaveToMainMenu => "leave to main menu",
            Trigger::BeginTraining => "begin training",
            Trigger::TrainingCompleted => "training completed",
            Trigger::TrainingAborted => "training aborted",
            Trigger::BeginDetect => "begin detect",
            Trigger::EndDetect => "end detect",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [EngineState; 5] = [
        EngineState::Idle,
        EngineState::ReadyToRecord,
        EngineState::Recording,
        EngineState::Training,
        EngineState::Detecting,
    ];

    const TRIGGERS: [Trigger; 9] = [
        Trigger::EnterRecordingTarget,
        Trigger::ContactEngaged,
        Trigger::ContactReleased,
        Trigger::LeaveToMainMenu,
        Trigger::BeginTraining,
        Trigger::TrainingCompleted,
        Trigger::TrainingAborted,
        Trigger::BeginDetect,
        Trigger::EndDetect,
    ];

    #[test]
    fn test_recording_cycle() {
        let state = EngineState::Idle;
        let state = state.next(Trigger::EnterRecordingTarget).unwrap();
        assert_eq!(state, EngineState::ReadyToRecord);
        let state = state.next(Trigger::ContactEngaged).unwrap();
        assert_eq!(state, EngineState::Recording);
        let state = state.next(Trigger::ContactReleased).unwrap();
        assert_eq!(state, EngineState::ReadyToRecord);
        let state = state.next(Trigger::LeaveToMainMenu).unwrap();
        assert_eq!(state, EngineState::Idle);
    }

    #[test]
    fn test_table_size() {
        let allowed = STATES
            .iter()
            .flat_map(|s| TRIGGERS.iter().map(move |t| (*s, *t)))
            .filter(|(s, t)| s.transition(*t).is_some())
            .count();
        // Ten (state, trigger) pairs in the table
        assert_eq!(allowed, 10);
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = EngineState::Recording.next(Trigger::BeginDetect).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::InvalidTransition {
                state: EngineState::Recording,
                trigger: Trigger::BeginDetect
            }
        ));
        assert_eq!(err.to_string(), "Cannot handle begin detect while recording");
    }

    #[test]
    fn test_training_only_from_idle() {
        for state in STATES {
            let allowed = state.transition(Trigger::BeginTraining).is_some();
            assert_eq!(allowed, state == EngineState::Idle, "{}", state);
        }
    }

    #[test]
    fn test_leave_to_main_menu_sources() {
        assert_eq!(
            EngineState::Idle.transition(Trigger::LeaveToMainMenu),
            Some(EngineState::Idle)
        );
        assert_eq!(EngineState::Recording.transition(Trigger::LeaveToMainMenu), None);
        assert_eq!(EngineState::Detecting.transition(Trigger::LeaveToMainMenu), None);
    }
}

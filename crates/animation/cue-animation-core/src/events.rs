//! Lifecycle events recorded by the scheduler.
//!
//! Every instance state transition appends one event, in the order the transitions
//! happened. Hosts and tests read them back to observe ordering (a superseded
//! instance's `Killed` always precedes its successor's `Started`).

use serde::{Deserialize, Serialize};

use crate::ids::{ElementId, InstId};

/// Discrete lifecycle signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
#[non_exhaustive]
pub enum CoreEvent {
    Created {
        inst: InstId,
        element: ElementId,
    },
    Started {
        inst: InstId,
        element: ElementId,
    },
    Paused {
        inst: InstId,
    },
    Resumed {
        inst: InstId,
    },
    Reversed {
        inst: InstId,
        reversed: bool,
    },
    Restarted {
        inst: InstId,
    },
    Completed {
        inst: InstId,
    },
    Killed {
        inst: InstId,
    },
    Seeked {
        inst: InstId,
        progress: f32,
    },
}

impl CoreEvent {
    /// Instance the event is about.
    pub fn inst(&self) -> InstId {
        match self {
            CoreEvent::Created { inst, .. }
            | CoreEvent::Started { inst, .. }
            | CoreEvent::Paused { inst }
            | CoreEvent::Resumed { inst }
            | CoreEvent::Reversed { inst, .. }
            | CoreEvent::Restarted { inst }
            | CoreEvent::Completed { inst }
            | CoreEvent::Killed { inst }
            | CoreEvent::Seeked { inst, .. } => *inst,
        }
    }

    #[inline]
    pub fn is_killed(&self) -> bool {
        matches!(self, CoreEvent::Killed { .. })
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        matches!(self, CoreEvent::Started { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let e = CoreEvent::Started {
            inst: InstId(3),
            element: ElementId(7),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["event"], "started");
        assert_eq!(json["inst"], 3);
        assert_eq!(e.inst(), InstId(3));
        assert!(e.is_started());
    }
}

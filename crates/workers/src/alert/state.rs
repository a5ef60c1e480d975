use serde::Serialize;

/// What a one-minute window showed for a device/sensor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowObservation {
    /// No aggregate in the window.
    Gap,
    Within,
    Breach,
}

/// Consecutive-breach counter for one device/sensor pair.
///
/// Only breaches move the counter. A window inside the band or with no
/// aggregate at all leaves it where it was. Reaching the trigger count
/// yields `Fired`, which counts as zero for the next window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreachState {
    Idle,
    Accumulating { count: u32 },
    Fired { count: u32 },
}

impl BreachState {
    pub fn transition(self, observation: WindowObservation, trigger_count: u32) -> Self {
        let current = self.consecutive_breaches();
        match observation {
            WindowObservation::Breach => {
                let count = current.saturating_add(1);
                if count >= trigger_count {
                    Self::Fired { count }
                } else {
                    Self::Accumulating { count }
                }
            }
            WindowObservation::Within | WindowObservation::Gap => match self {
                Self::Fired { .. } => Self::Idle,
                other => other,
            },
        }
    }

    pub fn consecutive_breaches(&self) -> u32 {
        match self {
            Self::Idle | Self::Fired { .. } => 0,
            Self::Accumulating { count } => *count,
        }
    }

    pub fn just_fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WindowObservation::*;

    fn walk(trigger: u32, observations: &[WindowObservation]) -> Vec<BreachState> {
        let mut state = BreachState::Idle;
        observations
            .iter()
            .map(|o| {
                state = state.transition(*o, trigger);
                state
            })
            .collect()
    }

    #[test]
    fn breach_accumulates() {
        let s = BreachState::Idle.transition(Breach, 3);
        assert_eq!(s, BreachState::Accumulating { count: 1 });
    }

    #[test]
    fn fires_at_trigger_then_resets() {
        let states = walk(2, &[Breach, Breach, Within]);
        assert!(states[1].just_fired());
        assert_eq!(states[1].consecutive_breaches(), 0);
        assert_eq!(states[2], BreachState::Idle);
    }

    #[test]
    fn trigger_of_one_fires_every_breach() {
        let states = walk(1, &[Breach, Breach, Breach]);
        assert!(states.iter().all(|s| s.just_fired()));
    }

    #[test]
    fn within_does_not_decrement() {
        let states = walk(3, &[Breach, Within, Breach]);
        assert_eq!(states[1].consecutive_breaches(), 1);
        assert!(states[2] == BreachState::Accumulating { count: 2 });
    }

    #[test]
    fn gap_leaves_counter() {
        let states = walk(3, &[Breach, Gap, Gap, Breach, Breach]);
        assert_eq!(states[2].consecutive_breaches(), 1);
        assert!(states[4].just_fired());
    }

    #[test]
    fn breach_after_fire_starts_over() {
        let states = walk(2, &[Breach, Breach, Breach]);
        assert_eq!(states[2], BreachState::Accumulating { count: 1 });
    }
}

// folds host-appended pointer transitions into queryable button state.
// runs as the built-in system at the reserved priority, so user systems
// always observe this tick's transitions.

use std::collections::{HashMap, HashSet};

use scene_component::components::{InputAction, InputResult, PointerEventType};

#[derive(Default)]
pub struct InputState {
    pressed: HashMap<InputAction, bool>,
    // transitions observed this tick
    triggered: HashSet<(InputAction, PointerEventType)>,
    last_timestamp: Option<u32>,
}

impl InputState {
    /// whether the button is currently held
    pub fn is_pressed(&self, action: InputAction) -> bool {
        self.pressed.get(&action).copied().unwrap_or(false)
    }

    /// whether the transition happened during this tick
    pub fn is_triggered(&self, action: InputAction, state: PointerEventType) -> bool {
        self.triggered.contains(&(action, state))
    }

    pub(crate) fn begin_tick(&mut self) {
        self.triggered.clear();
    }

    /// fold freshly appended transitions, oldest first. sets for different
    /// entities interleave, so order globally before applying
    pub(crate) fn update_from<'a>(&mut self, results: impl Iterator<Item = &'a InputResult>) {
        self.begin_tick();
        let mut fresh: Vec<&InputResult> = results
            .filter(|result| {
                self.last_timestamp
                    .map_or(true, |last| result.timestamp > last)
            })
            .collect();
        fresh.sort_by_key(|result| result.timestamp);
        for result in fresh {
            self.apply(result);
        }
    }

    pub(crate) fn apply(&mut self, result: &InputResult) {
        // the host's event counter only moves forward; replays of already
        // seen transitions are ignored
        if let Some(last) = self.last_timestamp {
            if result.timestamp <= last {
                return;
            }
        }
        self.last_timestamp = Some(result.timestamp);

        match result.state {
            PointerEventType::Down => {
                self.pressed.insert(result.button, true);
            }
            PointerEventType::Up => {
                self.pressed.insert(result.button, false);
            }
            PointerEventType::HoverEnter | PointerEventType::HoverLeave => (),
        }
        self.triggered.insert((result.button, result.state));
    }
}

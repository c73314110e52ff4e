//! Resource state tracking across the passes of a frame

use crate::backend::{PhysicalResource, ResourceState, Subresource};
use std::collections::HashMap;

/// A state change a pass needs before it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub resource: PhysicalResource,
    pub before: ResourceState,
    pub after: ResourceState,
    pub subresource: Subresource,
}

#[derive(Debug)]
struct TrackedState {
    /// State of every subresource without an entry in `subresources`
    whole: ResourceState,
    subresources: HashMap<u32, ResourceState>,
    subresource_count: u32,
}

impl TrackedState {
    fn state_of(&self, index: u32) -> ResourceState {
        self.subresources.get(&index).copied().unwrap_or(self.whole)
    }
}

/// Current state of every physical resource touched so far this frame.
///
/// Keyed by physical resource, so a slot shared by two logical resources
/// hands its final state from the first to the second.
#[derive(Debug, Default)]
pub(crate) struct StateTracker {
    states: HashMap<PhysicalResource, TrackedState>,
}

impl StateTracker {
    /// Move `resource` (or one subresource of it) to `after`, appending the
    /// transitions needed to `out`.
    ///
    /// `initial` and `subresource_count` are only used the first time the
    /// resource is seen.
    pub(crate) fn transition(
        &mut self,
        resource: PhysicalResource,
        initial: ResourceState,
        subresource_count: u32,
        subresource: Subresource,
        after: ResourceState,
        out: &mut Vec<Transition>,
    ) {
        let tracked = self.states.entry(resource).or_insert_with(|| TrackedState {
            whole: initial,
            subresources: HashMap::new(),
            subresource_count: subresource_count.max(1),
        });

        match subresource {
            Subresource::All if tracked.subresources.is_empty() => {
                if tracked.whole != after {
                    out.push(Transition {
                        resource,
                        before: tracked.whole,
                        after,
                        subresource: Subresource::All,
                    });
                    tracked.whole = after;
                }
            }
            Subresource::All => {
                for index in 0..tracked.subresource_count {
                    let before = tracked.state_of(index);
                    if before != after {
                        out.push(Transition {
                            resource,
                            before,
                            after,
                            subresource: Subresource::Index(index),
                        });
                    }
                }
                tracked.subresources.clear();
                tracked.whole = after;
            }
            Subresource::Index(index) => {
                assert!(
                    index < tracked.subresource_count,
                    "subresource {} of {:?} is out of range ({} subresources)",
                    index,
                    resource,
                    tracked.subresource_count
                );
                let before = tracked.state_of(index);
                if before == after {
                    return;
                }
                out.push(Transition {
                    resource,
                    before,
                    after,
                    subresource,
                });
                if after == tracked.whole {
                    tracked.subresources.remove(&index);
                } else {
                    tracked.subresources.insert(index, after);
                }
                // Collapse once every subresource agrees again.
                if tracked.subresources.len() as u32 == tracked.subresource_count {
                    let first = tracked.state_of(0);
                    if tracked.subresources.values().all(|state| *state == first) {
                        tracked.subresources.clear();
                        tracked.whole = first;
                    }
                }
            }
        }
    }

    /// Bring every resource whose subresources disagree back to one state.
    pub(crate) fn normalize(&mut self, out: &mut Vec<Transition>) {
        let mixed: Vec<_> = self
            .states
            .iter()
            .filter(|(_, tracked)| !tracked.subresources.is_empty())
            .map(|(resource, tracked)| (*resource, tracked.whole, tracked.subresource_count))
            .collect();
        for (resource, whole, count) in mixed {
            self.transition(resource, whole, count, Subresource::All, whole, out);
        }
    }

    pub(crate) fn state(&self, resource: PhysicalResource) -> Option<ResourceState> {
        self.states
            .get(&resource)
            .filter(|tracked| tracked.subresources.is_empty())
            .map(|tracked| tracked.whole)
    }

    /// Final whole-resource states. Resources with mixed subresource states are skipped.
    pub(crate) fn final_states(&self) -> Vec<(PhysicalResource, ResourceState)> {
        self.states
            .keys()
            .filter_map(|resource| self.state(*resource).map(|state| (*resource, state)))
            .collect()
    }
}

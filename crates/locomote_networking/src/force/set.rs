//! Collection of active forces owned by one movement backend.

use locomote_shared::Vec3;

use super::applier::ForceApplier;

/// Result of advancing a [`ForceApplierSet`] by one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceUpdate {
    /// Sum of the velocities of the additive forces.
    pub force_motion: Vec3,
    /// The replace-movement force, if one is active.
    pub replace_movement: Option<ForceApplier>,
}

/// Active forces. At most one replace-movement force is stored.
#[derive(Clone, Debug, Default)]
pub struct ForceApplierSet {
    appliers: Vec<ForceApplier>,
}

impl ForceApplierSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            appliers: Vec::new(),
        }
    }

    /// Adds a force. A replace-movement force evicts every other one.
    pub fn apply(&mut self, force: ForceApplier) {
        if force.mode.is_replace_movement() {
            self.appliers.retain(|f| !f.mode.is_replace_movement());
        }
        self.appliers.push(force);
    }

    /// Removes every force.
    pub fn clear(&mut self) {
        self.appliers.clear();
    }

    /// Adopts a server-sent list wholesale.
    ///
    /// Keeps only the last replace-movement entry if the list carries several.
    pub fn replace_with<I>(&mut self, forces: I)
    where
        I: IntoIterator<Item = ForceApplier>,
    {
        self.appliers.clear();
        for force in forces {
            self.apply(force);
        }
    }

    /// Advances every force, drops the ended ones and combines the rest.
    pub fn update(&mut self, delta_time: f32) -> ForceUpdate {
        self.appliers.retain_mut(|f| f.update(delta_time));

        let mut result = ForceUpdate::default();
        for force in &self.appliers {
            if force.mode.is_replace_movement() {
                result.replace_movement = Some(*force);
            } else {
                result.force_motion += force.velocity();
            }
        }
        result
    }

    /// Active forces.
    pub fn iter(&self) -> impl Iterator<Item = &ForceApplier> {
        self.appliers.iter()
    }

    /// At most `limit` forces for a state message: the replace-movement
    /// force first, then the newest additive forces.
    #[must_use]
    pub fn wire_forces(&self, limit: usize) -> Vec<ForceApplier> {
        if self.appliers.len() <= limit {
            return self.appliers.clone();
        }
        let replace = self.replace_movement();
        let additive = limit - usize::from(replace.is_some() && limit > 0);
        let mut newest: Vec<ForceApplier> = self
            .appliers
            .iter()
            .rev()
            .filter(|f| !f.mode.is_replace_movement())
            .take(additive)
            .copied()
            .collect();
        newest.reverse();
        replace.into_iter().take(limit).chain(newest).collect()
    }

    /// Active forces as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ForceApplier] {
        &self.appliers
    }

    /// Number of active forces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.appliers.len()
    }

    /// True if no force is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appliers.is_empty()
    }

    /// True if a replace-movement force is active.
    #[must_use]
    pub fn has_replace_movement(&self) -> bool {
        self.appliers.iter().any(|f| f.mode.is_replace_movement())
    }

    /// The active replace-movement force.
    #[must_use]
    pub fn replace_movement(&self) -> Option<ForceApplier> {
        self.appliers.iter().find(|f| f.mode.is_replace_movement()).copied()
    }
}

impl<'a> IntoIterator for &'a ForceApplierSet {
    type Item = &'a ForceApplier;
    type IntoIter = std::slice::Iter<'a, ForceApplier>;

    fn into_iter(self) -> Self::IntoIter {
        self.appliers.iter()
    }
}

/// Observer notified around every force update, in registration order.
pub trait ForceUpdateListener: Send {
    /// Called before forces are advanced.
    fn on_pre_update_forces(&mut self, forces: &ForceApplierSet) {
        let _ = forces;
    }

    /// Called after forces are advanced and combined.
    fn on_post_update_forces(&mut self, forces: &ForceApplierSet, update: &ForceUpdate) {
        let _ = (forces, update);
    }
}

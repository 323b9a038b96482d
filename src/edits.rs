use std::sync::Arc;

use cgmath::Vector3;
use parking_lot::Mutex;

use crate::collision::CollisionPlane;
use crate::force_field::ForceField;

/// Structural change queued from outside the frame loop.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEdit {
    AddForceField(ForceField),
    RemoveForceField(usize),
    SetCollisionPlanes(Vec<CollisionPlane>),
    SetGravity(Vector3<f32>),
    SetWindForce(Vector3<f32>),
}

/// Cloneable, thread-safe queue of [`SceneEdit`]s.
///
/// Edits are applied in submission order at the start of the owning
/// system's next update, never while particles are being integrated.
#[derive(Clone, Debug, Default)]
pub struct SceneEditHandle {
    pending: Arc<Mutex<Vec<SceneEdit>>>,
}

impl SceneEditHandle {
    pub fn push(&self, edit: SceneEdit) {
        self.pending.lock().push(edit);
    }

    pub fn add_force_field(&self, field: ForceField) {
        self.push(SceneEdit::AddForceField(field));
    }

    pub fn remove_force_field(&self, index: usize) {
        self.push(SceneEdit::RemoveForceField(index));
    }

    pub fn set_collision_planes(&self, planes: Vec<CollisionPlane>) {
        self.push(SceneEdit::SetCollisionPlanes(planes));
    }

    pub fn set_gravity(&self, gravity: Vector3<f32>) {
        self.push(SceneEdit::SetGravity(gravity));
    }

    pub fn set_wind_force(&self, wind: Vector3<f32>) {
        self.push(SceneEdit::SetWindForce(wind));
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn drain(&self) -> Vec<SceneEdit> {
        std::mem::take(&mut *self.pending.lock())
    }
}

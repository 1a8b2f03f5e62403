//! Optimistic-update reconciliation.
//!
//! The protocol lets a caller show a new entity immediately, before the
//! server confirms it:
//!
//! 1. [`stage`] inserts a provisional entity (locally unique id, flagged
//!    pending) and returns its id.
//! 2. The caller issues the create request.
//! 3. On success, [`commit`] swaps the provisional entry for the
//!    server-returned entities in a single store mutation — one request may
//!    confirm several entities (a sent chat message comes back as the user
//!    echo plus the assistant reply).
//! 4. On failure, [`fail`] keeps the provisional entry but flags it failed,
//!    so the user sees what went wrong and can retry or dismiss it. There is
//!    no automatic retry.
//!
//! All matching is by provisional id, never by list position: a slow create
//! can resolve after a later list refresh has already rewritten the store.

use uuid::Uuid;

use crate::models::Entity;
use crate::store::ResourceStore;

/// An entity that can exist locally before the server confirms it.
pub trait Optimistic: Entity {
    /// Flag the entity as awaiting confirmation.
    fn mark_pending(&mut self);
    /// Flag the entity as failed; clears the pending flag.
    fn mark_failed(&mut self);
}

impl Optimistic for crate::models::Message {
    fn mark_pending(&mut self) {
        self.pending = true;
        self.error = false;
    }

    fn mark_failed(&mut self) {
        self.pending = false;
        self.error = true;
    }
}

/// A locally unique id for a provisional entity. The prefix keeps it from
/// ever colliding with a server-assigned id.
pub fn provisional_id() -> String {
    format!("local-{}", Uuid::new_v4())
}

/// Insert a provisional entity flagged pending; returns its id.
pub fn stage<T: Optimistic>(store: &mut ResourceStore<T>, mut entity: T) -> String {
    entity.mark_pending();
    let id = entity.id().to_string();
    store.insert(entity);
    id
}

/// Swap the provisional entry for the confirmed server entities.
///
/// Untouched entities keep their relative order; server entities are
/// appended in the order the server returned them; an id that is already
/// present (e.g. a refresh landed first) is never duplicated.
pub fn commit<T: Optimistic>(
    store: &mut ResourceStore<T>,
    provisional_id: &str,
    server_entities: Vec<T>,
) {
    store.swap(provisional_id, server_entities);
}

/// Keep the provisional entry, flagged failed.
pub fn fail<T: Optimistic>(store: &mut ResourceStore<T>, provisional_id: &str) {
    store.patch(provisional_id, |entity| entity.mark_failed());
}

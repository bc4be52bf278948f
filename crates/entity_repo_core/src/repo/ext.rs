//! Convenience operations layered on top of any base repository.
//!
//! Every method here is a composition of [`EntityRepository`] calls, so each
//! step runs in its own session.

use crate::model::entity::{Entity, EntityId};
use crate::repo::entity_repo::EntityRepository;
use crate::repo::error::RepoResult;
use crate::repo::query::{Filter, Patch};

/// Id-oriented helpers available on every [`EntityRepository`].
pub trait RepositoryExt<E: Entity>: EntityRepository<E> {
    fn get_by_id(&self, id: EntityId) -> RepoResult<E> {
        self.get(id)
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        self.get_batch(&Filter::new())
    }

    /// Ids without a stored row are skipped.
    fn get_batch_by_ids(&self, ids: &[EntityId]) -> RepoResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_batch(&Filter::by_ids(ids))
    }

    fn update_by_id(&self, id: EntityId, patch: &Patch) -> RepoResult<E> {
        let entity = self.get(id)?;
        self.update(&entity, patch)
    }

    fn update_batch_by_ids(&self, ids: &[EntityId], patch: &Patch) -> RepoResult<Vec<E>> {
        let entities = self.get_batch_by_ids(ids)?;
        self.update_batch(&entities, patch)
    }

    fn delete_by_id(&self, id: EntityId) -> RepoResult<E> {
        let entity = self.get(id)?;
        self.delete(entity)
    }

    fn delete_batch_by_ids(&self, ids: &[EntityId]) -> RepoResult<Vec<E>> {
        let entities = self.get_batch_by_ids(ids)?;
        self.delete_batch(entities)
    }
}

impl<E: Entity, R: EntityRepository<E> + ?Sized> RepositoryExt<E> for R {}

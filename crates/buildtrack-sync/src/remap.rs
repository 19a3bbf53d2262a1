// File: buildtrack-sync/src/remap.rs
// Purpose: Temporary-id to server-id mapping built during one sync pass

use buildtrack_core::{ActionPayload, EntityRef, TemporaryId};
use std::collections::HashMap;

/// Mapping from [`TemporaryId`] to the id the server assigned.
///
/// Lives for a single sync pass.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRemap {
    ids: HashMap<TemporaryId, i64>,
}

impl IdentifierRemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, temp_id: TemporaryId, server_id: i64) {
        self.ids.insert(temp_id, server_id);
    }

    pub fn get(&self, temp_id: &TemporaryId) -> Option<i64> {
        self.ids.get(temp_id).copied()
    }

    /// Resolve a reference, leaving unknown temporaries untouched
    pub fn resolve_ref(&self, entity: &EntityRef) -> EntityRef {
        match entity {
            EntityRef::Temporary(tmp) => match self.get(tmp) {
                Some(id) => EntityRef::Server(id),
                None => entity.clone(),
            },
            EntityRef::Server(_) => entity.clone(),
        }
    }

    /// Rewrite the payload's temporary references in place
    pub fn resolve(&self, payload: &mut ActionPayload) -> usize {
        payload.rewrite_refs(|tmp| self.get(tmp))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildtrack_core::{NewComment, TaskPatch};

    #[test]
    fn test_resolve_known_reference() {
        let tmp = TemporaryId::new();
        let mut remap = IdentifierRemap::new();
        remap.record(tmp.clone(), 31);

        let mut payload = ActionPayload::AddComment {
            task_id: tmp.clone().into(),
            comment: NewComment { body: "Done".into(), author_id: Some(2) },
            temp_id: None,
        };
        assert_eq!(remap.resolve(&mut payload), 1);
        assert_eq!(payload.task_ref(), Some(&EntityRef::Server(31)));
        assert_eq!(remap.resolve_ref(&tmp.into()), EntityRef::Server(31));
    }

    #[test]
    fn test_unknown_reference_is_left_alone() {
        let remap = IdentifierRemap::new();
        let tmp = TemporaryId::new();
        let mut payload = ActionPayload::UpdateTask {
            task_id: tmp.clone().into(),
            changes: TaskPatch::default(),
        };

        assert_eq!(remap.resolve(&mut payload), 0);
        assert_eq!(payload.task_ref(), Some(&EntityRef::Temporary(tmp)));
        assert!(remap.is_empty());
    }
}

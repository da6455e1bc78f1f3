//! Mutation Observers
//!
//! Records are queued per observer when the document mutates and taken in
//! batches by whoever drives the event loop.

use std::cell::RefCell;
use std::rc::Weak;

use crate::{Document, NodeId};

/// Observer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u32);

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

impl MutationRecord {
    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub(crate) fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: None,
            old_value: Some(old_value),
        }
    }
}

#[derive(Debug)]
struct MutationObserver {
    target: NodeId,
    options: MutationObserverInit,
    records: Vec<MutationRecord>,
}

impl MutationObserver {
    /// `path` is the inclusive ancestor chain of the record target, bounded
    /// by its tree root (shadow boundaries are not crossed).
    fn wants(&self, record: &MutationRecord, path: &[NodeId]) -> bool {
        let in_scope = if self.options.subtree {
            path.contains(&self.target)
        } else {
            record.target == self.target
        };
        if !in_scope {
            return false;
        }

        match record.mutation_type {
            MutationType::ChildList => self.options.child_list,
            MutationType::CharacterData => self.options.character_data,
            MutationType::Attributes => {
                if !self.options.attributes {
                    return false;
                }
                match (&self.options.attribute_filter, &record.attribute_name) {
                    (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                    _ => true,
                }
            }
        }
    }
}

/// All observers of one document, in registration order
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    observers: Vec<Option<MutationObserver>>,
}

impl ObserverRegistry {
    pub(crate) fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        let id = ObserverId(self.observers.len() as u32);
        self.observers.push(Some(MutationObserver {
            target,
            options,
            records: Vec::new(),
        }));
        id
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        match self.observers.get_mut(id.0 as usize) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.iter().all(Option::is_none)
    }

    pub(crate) fn queue(&mut self, record: MutationRecord, path: &[NodeId]) {
        for observer in self.observers.iter_mut().flatten() {
            if observer.wants(&record, path) {
                let mut record = record.clone();
                if record.mutation_type == MutationType::Attributes
                    && !observer.options.attribute_old_value
                {
                    record.old_value = None;
                }
                observer.records.push(record);
            }
        }
    }

    pub(crate) fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        match self.observers.get_mut(id.0 as usize) {
            Some(Some(observer)) => std::mem::take(&mut observer.records),
            _ => Vec::new(),
        }
    }

    /// Observers with queued records, in registration order
    pub(crate) fn pending(&self) -> Vec<ObserverId> {
        self.observers.iter()
            .enumerate()
            .filter_map(|(i, o)| match o {
                Some(o) if !o.records.is_empty() => Some(ObserverId(i as u32)),
                _ => None,
            })
            .collect()
    }
}

/// Disconnects its observer when dropped
#[derive(Debug)]
pub struct ObserverGuard {
    document: Weak<RefCell<Document>>,
    id: ObserverId,
}

impl ObserverGuard {
    pub fn new(document: Weak<RefCell<Document>>, id: ObserverId) -> Self {
        Self { document, id }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        match document.try_borrow_mut() {
            Ok(mut doc) => {
                doc.disconnect_observer(self.id);
            }
            Err(_) => {
                tracing::warn!(observer = self.id.0, "Document busy, observer left connected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_filter() {
        let mut registry = ObserverRegistry::default();
        let id = registry.observe(NodeId(3), MutationObserverInit {
            attributes: true,
            attribute_filter: Some(vec!["data-prop-x".into()]),
            ..Default::default()
        });

        registry.queue(MutationRecord::attribute(NodeId(3), "class", None), &[NodeId(3)]);
        registry.queue(MutationRecord::attribute(NodeId(3), "data-prop-x", None), &[NodeId(3)]);

        let records = registry.take_records(id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute_name.as_deref(), Some("data-prop-x"));
    }

    #[test]
    fn test_subtree_scope() {
        let mut registry = ObserverRegistry::default();
        let shallow = registry.observe(NodeId(1), MutationObserverInit {
            child_list: true,
            ..Default::default()
        });
        let deep = registry.observe(NodeId(1), MutationObserverInit {
            child_list: true,
            subtree: true,
            ..Default::default()
        });

        let record = MutationRecord::child_list(NodeId(2), vec![NodeId(5)], vec![]);
        registry.queue(record, &[NodeId(2), NodeId(1), NodeId(0)]);

        assert_eq!(registry.pending(), vec![deep]);
        assert!(registry.take_records(shallow).is_empty());
    }

    #[test]
    fn test_old_value_only_when_requested() {
        let mut registry = ObserverRegistry::default();
        let id = registry.observe(NodeId(1), MutationObserverInit {
            attributes: true,
            ..Default::default()
        });

        registry.queue(MutationRecord::attribute(NodeId(1), "a", Some("old".into())), &[NodeId(1)]);
        assert_eq!(registry.take_records(id)[0].old_value, None);
    }

    #[test]
    fn test_disconnect() {
        let mut registry = ObserverRegistry::default();
        let id = registry.observe(NodeId(1), MutationObserverInit::default());

        assert!(registry.disconnect(id));
        assert!(!registry.disconnect(id));
        assert!(registry.is_empty());
    }
}

//! Materialised instances of one repeated region

use crate::reconcile::diff::{reconcile, Edit};
use crate::reconcile::keys::{RepeatItem, RepeatMarker};

/// One rendered copy of the region's template
#[derive(Debug, Clone, PartialEq)]
pub struct Instance<H> {
    /// Sequence number, unique within the region
    pub id: u64,
    pub key: String,
    /// Whatever the host uses to address the copy
    pub handle: H,
}

/// Counts from one [`RepeatRegion::sync`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub reused: usize,
    pub added: usize,
    pub removed: usize,
}

/// Keeps the instances of a repeated region in order across renders
#[derive(Debug, Clone)]
pub struct RepeatRegion<H> {
    marker: RepeatMarker,
    instances: Vec<Instance<H>>,
    next_id: u64,
}

impl<H> RepeatRegion<H> {
    pub fn new(marker: RepeatMarker) -> Self {
        Self {
            marker,
            instances: Vec::new(),
            next_id: 0,
        }
    }

    pub fn marker(&self) -> &RepeatMarker {
        &self.marker
    }

    pub fn instances(&self) -> &[Instance<H>] {
        &self.instances
    }

    pub fn keys(&self) -> Vec<&str> {
        self.instances.iter().map(|i| i.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Bring the instances in line with `items`.
    ///
    /// `create` builds the handle of a new instance, `render` is called for
    /// every new and reused instance with its current item, and `retire`
    /// receives the handles of removed instances. A `{name}` region keeps a
    /// single instance and only re-renders it.
    pub fn sync<C, R, D>(
        &mut self,
        items: Vec<RepeatItem>,
        mut create: C,
        mut render: R,
        mut retire: D,
    ) -> SyncSummary
    where
        C: FnMut(&RepeatItem) -> H,
        R: FnMut(&mut H, &RepeatItem),
        D: FnMut(H),
    {
        let mut summary = SyncSummary::default();

        if !self.marker.is_sequence() {
            let Some(item) = items.into_iter().next() else {
                return summary;
            };
            match self.instances.first_mut() {
                Some(instance) => {
                    instance.key = item.key.clone();
                    render(&mut instance.handle, &item);
                    summary.reused += 1;
                }
                None => {
                    let instance = self.materialise(&item, &mut create, &mut render);
                    self.instances.push(instance);
                    summary.added += 1;
                }
            }
            return summary;
        }

        let previous: Vec<(String, Instance<H>)> = self
            .instances
            .drain(..)
            .map(|instance| (instance.key.clone(), instance))
            .collect();
        let current: Vec<(String, RepeatItem)> = items
            .into_iter()
            .map(|item| (item.key.clone(), item))
            .collect();

        let mut kept = Vec::with_capacity(current.len());
        for edit in reconcile(previous, current) {
            match edit {
                Edit::Reuse {
                    mut instance,
                    item,
                } => {
                    render(&mut instance.handle, &item);
                    kept.push(instance);
                    summary.reused += 1;
                }
                Edit::Add(item) => {
                    kept.push(self.materialise(&item, &mut create, &mut render));
                    summary.added += 1;
                }
                Edit::Remove(instance) => {
                    retire(instance.handle);
                    summary.removed += 1;
                }
            }
        }
        self.instances = kept;

        log::debug!(
            "region {}: {} reused, {} added, {} removed",
            self.marker,
            summary.reused,
            summary.added,
            summary.removed
        );
        summary
    }

    fn materialise<C, R>(&mut self, item: &RepeatItem, create: &mut C, render: &mut R) -> Instance<H>
    where
        C: FnMut(&RepeatItem) -> H,
        R: FnMut(&mut H, &RepeatItem),
    {
        let mut handle = create(item);
        render(&mut handle, item);
        let id = self.next_id;
        self.next_id += 1;
        Instance {
            id,
            key: item.key.clone(),
            handle,
        }
    }
}

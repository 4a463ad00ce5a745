//! Keyed diff between the previous instances of a repeated region and the
//! current items
//!
//! Only insertions and deletions relative to the previous order are
//! recognised. An item that moved is removed and re-added.

use std::collections::VecDeque;

/// One step of an edit plan
#[derive(Debug, Clone, PartialEq)]
pub enum Edit<I, T> {
    /// Keep the previous instance, re-rendered with the current item
    Reuse { instance: I, item: T },
    /// Create a new instance for the item
    Add(T),
    /// Discard a previous instance
    Remove(I),
}

impl<I, T> Edit<I, T> {
    pub fn is_reuse(&self) -> bool {
        matches!(self, Edit::Reuse { .. })
    }

    pub fn is_add(&self) -> bool {
        matches!(self, Edit::Add(_))
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, Edit::Remove(_))
    }
}

enum Step {
    Reuse,
    Add,
    Remove,
}

/// Compute the edit plan turning `previous` into `current`.
///
/// Replaying the plan in order (keeping reused instances, inserting added
/// items, skipping removed instances) yields the keys of `current` in order.
/// Duplicate keys are matched in encounter order.
pub fn reconcile<K, I, T>(previous: Vec<(K, I)>, current: Vec<(K, T)>) -> Vec<Edit<I, T>>
where
    K: PartialEq,
{
    let mut previous: VecDeque<(K, I)> = previous.into();
    let mut current: VecDeque<(K, T)> = current.into();
    let mut plan = Vec::with_capacity(previous.len().max(current.len()));

    loop {
        let step = match (previous.front(), current.front()) {
            (None, None) => break,
            (None, Some(_)) => Step::Add,
            (Some(_), None) => Step::Remove,
            (Some((prev_key, _)), Some((cur_key, _))) if prev_key == cur_key => Step::Reuse,
            (Some((prev_key, _)), Some((cur_key, _))) => {
                // Where the current head shows up again among the previous
                // instances, and where the previous head shows up among the
                // current items
                let cur_in_prev = previous.iter().skip(1).position(|(k, _)| k == cur_key);
                let prev_in_cur = current.iter().skip(1).position(|(k, _)| k == prev_key);
                match (prev_in_cur, cur_in_prev) {
                    (Some(_), None) => Step::Add,
                    (Some(p), Some(c)) if p < c => Step::Add,
                    _ => Step::Remove,
                }
            }
        };

        match step {
            Step::Reuse => {
                if let (Some((_, instance)), Some((_, item))) =
                    (previous.pop_front(), current.pop_front())
                {
                    plan.push(Edit::Reuse { instance, item });
                }
            }
            Step::Add => {
                if let Some((_, item)) = current.pop_front() {
                    plan.push(Edit::Add(item));
                }
            }
            Step::Remove => {
                if let Some((_, instance)) = previous.pop_front() {
                    plan.push(Edit::Remove(instance));
                }
            }
        }
    }

    plan
}

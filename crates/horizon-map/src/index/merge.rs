use super::{LodDataPoint, LodNode};
use crate::coordinates::NodeKey;

use smallvec::SmallVec;

/// Summarizes four sibling nodes into their parent. The parent's mode is the least faithful child mode.
pub fn merge_children(parent: NodeKey, children: [&LodNode; 4]) -> LodNode {
    let mut materials = ModeCounter::default();
    let mut min_height = i32::MAX;
    let mut max_height = i32::MIN;
    let mut light = 0;
    let mut mode = children[0].mode;
    for child in children {
        materials.add(&child.data.material);
        min_height = min_height.min(child.data.min_height);
        max_height = max_height.max(child.data.max_height);
        if child.data.max_height == max_height {
            light = child.data.light;
        }
        mode = mode.min(child.mode);
    }
    let material = materials
        .into_mode()
        .unwrap_or_else(|| children[0].data.material.clone());

    LodNode::new(
        parent,
        LodDataPoint::new(min_height, max_height, material, light),
        mode,
    )
}

/// Counts occurrences of labels in a small population. Ties go to the label seen first.
#[derive(Clone, Debug)]
pub struct ModeCounter<T> {
    counts: SmallVec<[LabelCount<T>; 8]>,
}

impl<T> Default for ModeCounter<T> {
    fn default() -> Self {
        Self {
            counts: SmallVec::new(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct LabelCount<T> {
    label: T,
    count: usize,
}

impl<T: Clone + Eq> ModeCounter<T> {
    pub fn add(&mut self, label: &T) {
        match self.counts.iter_mut().find(|c| c.label == *label) {
            Some(c) => c.count += 1,
            None => self.counts.push(LabelCount {
                label: label.clone(),
                count: 1,
            }),
        }
    }

    pub fn mode(&self) -> Option<(&T, usize)> {
        let mut best: Option<&LabelCount<T>> = None;
        for c in self.counts.iter() {
            if best.map_or(true, |b| c.count > b.count) {
                best = Some(c);
            }
        }
        best.map(|b| (&b.label, b.count))
    }

    pub fn into_mode(self) -> Option<T> {
        let mut best: Option<LabelCount<T>> = None;
        for c in self.counts.into_iter() {
            if best.as_ref().map_or(true, |b| c.count > b.count) {
                best = Some(c);
            }
        }
        best.map(|b| b.label)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_label_is_mode() {
        let mut counter = ModeCounter::default();
        counter.add(&1);
        assert_eq!(counter.mode(), Some((&1, 1)));
    }

    #[test]
    fn two_labels_tie_for_mode() {
        let mut counter = ModeCounter::default();
        counter.add(&1);
        counter.add(&0);
        assert_eq!(counter.mode(), Some((&1, 1)));
    }

    #[test]
    fn many_labels() {
        let mut counter = ModeCounter::default();
        for label in [1, 8, 2, 4, 4, 4, 3, 3, 3, 3] {
            counter.add(&label);
        }
        assert_eq!(counter.mode(), Some((&3, 4)));
        assert_eq!(counter.into_mode(), Some(3));
    }

    #[test]
    fn empty_counter_has_no_mode() {
        let counter = ModeCounter::<u8>::default();
        assert_eq!(counter.mode(), None);
    }
}

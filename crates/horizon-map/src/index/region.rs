use super::{merge_children, LodNode};
use crate::coordinates::{child_index, ChildIndex, Level, NodeKey, REGION_LEVEL};
use crate::core::glam::IVec2;

/// Whether a tree walk should descend into the children of the visited node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VisitCommand {
    Continue,
    SkipDescendants,
}

/// The quadtree of one 512x512 block region. The root is at [`REGION_LEVEL`].
#[derive(Debug)]
pub struct RegionTree {
    coordinates: IVec2,
    root: QuadNode,
    len: usize,
}

#[derive(Debug, Default)]
struct QuadNode {
    value: Option<LodNode>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl RegionTree {
    pub fn new(coordinates: IVec2) -> Self {
        Self {
            coordinates,
            root: QuadNode::default(),
            len: 0,
        }
    }

    pub fn coordinates(&self) -> IVec2 {
        self.coordinates
    }

    pub fn root_key(&self) -> NodeKey {
        NodeKey::new(REGION_LEVEL, self.coordinates)
    }

    /// Number of nodes holding a value.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: NodeKey) -> Option<&LodNode> {
        debug_assert_eq!(key.region(), self.coordinates);
        let mut node = &self.root;
        for child_i in path_from_root(key) {
            node = &node.children.as_ref()?[child_i as usize];
        }
        node.value.as_ref()
    }

    /// Writes `node` unless that would downgrade the existing node's provenance. Returns true if the tree changed.
    pub fn insert(&mut self, node: LodNode) -> bool {
        debug_assert_eq!(node.key.region(), self.coordinates);
        let slot = self.slot_mut(node.key);
        if let Some(existing) = slot.as_mut() {
            if !existing.may_be_replaced_by(&node) || *existing == node {
                return false;
            }
            *existing = node;
            return true;
        }
        *slot = Some(node);
        self.len += 1;
        true
    }

    /// Writes `node` and then re-summarizes each ancestor whose four children are all present.
    pub fn insert_and_propagate(&mut self, node: LodNode) -> bool {
        let mut key = node.key;
        if !self.insert(node) {
            return false;
        }
        while let Some(parent) = key.parent() {
            let children = parent.children();
            let merged = match [
                self.get(children[0]),
                self.get(children[1]),
                self.get(children[2]),
                self.get(children[3]),
            ] {
                [Some(c0), Some(c1), Some(c2), Some(c3)] => merge_children(parent, [c0, c1, c2, c3]),
                _ => break,
            };
            if !self.insert(merged) {
                break;
            }
            key = parent;
        }
        true
    }

    /// Depth-first walk from the root down to `min_level`, visiting vacant nodes too.
    pub fn visit(&self, min_level: Level, mut visitor: impl FnMut(NodeKey, Option<&LodNode>) -> VisitCommand) {
        visit_recursive(&self.root, self.root_key(), min_level, &mut visitor);
    }

    fn slot_mut(&mut self, key: NodeKey) -> &mut Option<LodNode> {
        let mut node = &mut self.root;
        for child_i in path_from_root(key) {
            node = &mut node.children.get_or_insert_with(Default::default)[child_i as usize];
        }
        &mut node.value
    }
}

fn visit_recursive(
    node: &QuadNode,
    key: NodeKey,
    min_level: Level,
    visitor: &mut impl FnMut(NodeKey, Option<&LodNode>) -> VisitCommand,
) {
    if visitor(key, node.value.as_ref()) == VisitCommand::SkipDescendants || key.level <= min_level {
        return;
    }
    if let Some(children) = node.children.as_ref() {
        for (child, child_key) in children.iter().zip(key.children()) {
            visit_recursive(child, child_key, min_level, visitor);
        }
    }
}

/// Child indices leading from the region root down to `key`.
fn path_from_root(key: NodeKey) -> impl Iterator<Item = ChildIndex> {
    (key.level..REGION_LEVEL)
        .rev()
        .map(move |level| child_index(key.coordinates >> (level - key.level) as i32))
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

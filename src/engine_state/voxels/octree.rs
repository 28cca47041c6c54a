//! # Voxel Octree Module
//!
//! Sparse per-chunk storage. Each chunk owns one fixed-depth octree whose root
//! sits at the chunk center; internal nodes split space into eight octants and
//! the leaves at depth [`OCTREE_DEPTH`] hold exactly one voxel each.
//!
//! ## Octant Addressing
//!
//! Descent runs on chunk-local coordinates in doubled integer units, so the
//! chunk midpoint `3.5` is `7` and every node center is an exact integer. The
//! child slot for a position is a 3-bit index built by comparing the doubled
//! local position against the node center along each axis:
//! - bit 0: `x >= center.x`
//! - bit 1: `y >= center.y`
//! - bit 2: `z >= center.z`
//!
//! The comparison is inclusive. Boundary voxels always fall into the upper octant,
//! and chunk alignment and face culling rely on that same rule.
//!
//! ## Memory Characteristics
//! - Nodes are created lazily; a missing child means "no voxel in that octant"
//! - Removing the last voxel under an internal node prunes the node
//! - Every child is owned outright by its parent, so dropping the root frees the tree

use cgmath::Point3;

use super::{error::VoxelError, voxel::Voxel};

/// Number of levels between the root and the leaves.
pub const OCTREE_DEPTH: usize = 3;

/// Cells per axis covered by one tree.
const EXTENT: i32 = 1 << OCTREE_DEPTH;

/// Root center in doubled local units.
pub const ROOT_CENTER: i32 = EXTENT - 1;

/// Offset from the root center to the centers of its children, in doubled local units.
///
/// The first split lands a quarter of the extent away from the center. Each
/// further level halves it.
pub const ROOT_CHILD_OFFSET: i32 = EXTENT / 2;

/// Computes the octant index of `position` relative to a node centered at `center`.
///
/// Both points are in doubled local units.
pub fn octant_index(position: Point3<i32>, center: Point3<i32>) -> usize {
    let mut index = 0;
    if position.x >= center.x {
        index |= 1;
    }
    if position.y >= center.y {
        index |= 2;
    }
    if position.z >= center.z {
        index |= 4;
    }
    index
}

/// Center of the child in `octant`, offset by `offset` per axis in the octant's direction.
pub fn child_center(center: Point3<i32>, octant: usize, offset: i32) -> Point3<i32> {
    let step = |bit: usize| if octant & bit != 0 { offset } else { -offset };
    Point3::new(center.x + step(1), center.y + step(2), center.z + step(4))
}

/// A node of the octree.
#[derive(Debug)]
enum OctreeNode {
    Internal(Box<InternalNode>),
    Leaf(Voxel),
}

#[derive(Debug)]
struct InternalNode {
    center: Point3<i32>,
    children: [Option<OctreeNode>; 8],
}

impl InternalNode {
    fn new(center: Point3<i32>) -> Self {
        InternalNode {
            center,
            children: Default::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    fn collect_voxels(&self, voxels: &mut Vec<Voxel>) {
        for child in self.children.iter().flatten() {
            match child {
                OctreeNode::Internal(node) => node.collect_voxels(voxels),
                OctreeNode::Leaf(voxel) => voxels.push(*voxel),
            }
        }
    }

    fn remove(&mut self, target: Point3<i32>, position: Point3<i32>) -> Option<Voxel> {
        let slot = &mut self.children[octant_index(target, self.center)];

        if matches!(slot, Some(OctreeNode::Leaf(voxel)) if voxel.position == position) {
            return match slot.take() {
                Some(OctreeNode::Leaf(voxel)) => Some(voxel),
                _ => None,
            };
        }

        let (removed, prune) = match slot.as_mut() {
            Some(OctreeNode::Internal(child)) => {
                let removed = child.remove(target, position);
                (removed, child.is_empty())
            }
            _ => return None,
        };
        if prune {
            *slot = None;
        }
        removed
    }
}

/// The voxel tree of a single chunk.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_engine::{Voxel, VoxelColor, VoxelOctree};
///
/// let mut octree = VoxelOctree::new(Point3::new(0, 0, 0));
/// let voxel = Voxel::new(Point3::new(3, 3, 3), VoxelColor::new(0, 150, 0, 255));
/// octree.insert(voxel).unwrap();
/// assert_eq!(octree.find(Point3::new(3, 3, 3)), Some(&voxel));
/// ```
#[derive(Debug)]
pub struct VoxelOctree {
    corner: Point3<i32>,
    root: InternalNode,
    len: usize,
}

impl VoxelOctree {
    /// Creates an empty octree covering the cells from `corner` to `corner + 7`.
    pub fn new(corner: Point3<i32>) -> Self {
        VoxelOctree {
            corner,
            root: InternalNode::new(Point3::new(ROOT_CENTER, ROOT_CENTER, ROOT_CENTER)),
            len: 0,
        }
    }

    /// Lowest corner cell covered by the tree.
    pub fn corner(&self) -> Point3<i32> {
        self.corner
    }

    /// `position` in doubled local units, or `None` outside the tree's cells.
    fn local_target(&self, position: Point3<i32>) -> Option<Point3<i32>> {
        let axis = |p: i32, corner: i32| {
            p.checked_sub(corner)
                .filter(|local| (0..EXTENT).contains(local))
                .map(|local| local * 2)
        };
        Some(Point3::new(
            axis(position.x, self.corner.x)?,
            axis(position.y, self.corner.y)?,
            axis(position.z, self.corner.z)?,
        ))
    }

    /// Number of voxels stored in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no voxels.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a voxel, creating missing nodes along the way.
    ///
    /// Inserting at an occupied position overwrites the stored color.
    ///
    /// # Errors
    /// [`VoxelError::InsertionFailed`] if the position lies outside the tree or
    /// the descent does not end in a leaf slot.
    pub fn insert(&mut self, voxel: Voxel) -> Result<(), VoxelError> {
        let target = self
            .local_target(voxel.position)
            .ok_or(VoxelError::InsertionFailed {
                position: voxel.position,
            })?;
        let mut node = &mut self.root;
        let mut offset = ROOT_CHILD_OFFSET;

        for level in 0..OCTREE_DEPTH {
            let center = node.center;
            let octant = octant_index(target, center);
            let slot = &mut node.children[octant];

            if level + 1 == OCTREE_DEPTH {
                if matches!(slot, Some(OctreeNode::Internal(_))) {
                    return Err(VoxelError::InsertionFailed {
                        position: voxel.position,
                    });
                }
                if slot.replace(OctreeNode::Leaf(voxel)).is_none() {
                    self.len += 1;
                }
                return Ok(());
            }

            if slot.is_none() {
                *slot = Some(OctreeNode::Internal(Box::new(InternalNode::new(
                    child_center(center, octant, offset),
                ))));
            }

            node = match slot {
                Some(OctreeNode::Internal(child)) => child.as_mut(),
                _ => {
                    return Err(VoxelError::InsertionFailed {
                        position: voxel.position,
                    })
                }
            };
            offset /= 2;
        }

        Err(VoxelError::InsertionFailed {
            position: voxel.position,
        })
    }

    /// Finds the voxel stored at `position`, if any.
    pub fn find(&self, position: Point3<i32>) -> Option<&Voxel> {
        let target = self.local_target(position)?;
        let mut node = &self.root;

        for _ in 0..OCTREE_DEPTH {
            match node.children[octant_index(target, node.center)].as_ref()? {
                OctreeNode::Internal(child) => node = child,
                OctreeNode::Leaf(voxel) => {
                    return (voxel.position == position).then_some(voxel);
                }
            }
        }

        None
    }

    /// Removes and returns the voxel at `position`, pruning emptied nodes.
    pub fn remove(&mut self, position: Point3<i32>) -> Option<Voxel> {
        let removed = self.root.remove(self.local_target(position)?, position);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Returns every stored voxel in octant order.
    pub fn voxels(&self) -> Vec<Voxel> {
        let mut voxels = Vec::with_capacity(self.len);
        self.root.collect_voxels(&mut voxels);
        voxels
    }

    /// Centers of the internal nodes visited on the way to `position`, root
    /// first, in doubled local units.
    ///
    /// Stops early where the tree has no node for the position, and is empty
    /// for positions outside the tree.
    pub fn node_centers(&self, position: Point3<i32>) -> Vec<Point3<i32>> {
        let Some(target) = self.local_target(position) else {
            return Vec::new();
        };
        let mut centers = vec![self.root.center];
        let mut node = &self.root;

        while let Some(OctreeNode::Internal(child)) =
            node.children[octant_index(target, node.center)].as_ref()
        {
            centers.push(child.center);
            node = child;
        }

        centers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::voxel::VoxelColor;

    const GREEN: VoxelColor = VoxelColor::new(0, 150, 0, 255);

    fn chunk_octree() -> VoxelOctree {
        VoxelOctree::new(Point3::new(0, 0, 0))
    }

    #[test]
    fn octant_comparison_is_inclusive() {
        let center = Point3::new(2, 2, 2);
        assert_eq!(octant_index(Point3::new(2, 2, 2), center), 7);
        assert_eq!(octant_index(Point3::new(1, 2, 1), center), 2);
        assert_eq!(octant_index(Point3::new(0, 0, 0), center), 0);
    }

    #[test]
    fn child_centers_follow_octant_sign() {
        let center = Point3::new(ROOT_CENTER, ROOT_CENTER, ROOT_CENTER);
        assert_eq!(child_center(center, 0, ROOT_CHILD_OFFSET), Point3::new(3, 3, 3));
        assert_eq!(child_center(center, 5, ROOT_CHILD_OFFSET), Point3::new(11, 3, 11));
    }

    #[test]
    fn every_cell_of_a_chunk_gets_its_own_leaf() {
        let mut octree = chunk_octree();
        for x in 0..8 {
            for y in 0..8 {
                for z in 0..8 {
                    let color = VoxelColor::new(x as u8, y as u8, z as u8, 255);
                    octree.insert(Voxel::new(Point3::new(x, y, z), color)).unwrap();
                }
            }
        }

        assert_eq!(octree.len(), 512);
        for voxel in octree.voxels() {
            let p = voxel.position;
            assert_eq!(voxel.color, VoxelColor::new(p.x as u8, p.y as u8, p.z as u8, 255));
        }
    }

    #[test]
    fn reinsert_overwrites_color() {
        let mut octree = chunk_octree();
        let position = Point3::new(4, 0, 7);
        octree.insert(Voxel::new(position, GREEN)).unwrap();
        octree
            .insert(Voxel::new(position, VoxelColor::new(9, 9, 9, 255)))
            .unwrap();

        assert_eq!(octree.len(), 1);
        assert_eq!(octree.find(position).unwrap().color, VoxelColor::new(9, 9, 9, 255));
    }

    #[test]
    fn remove_prunes_empty_branches() {
        let mut octree = chunk_octree();
        let position = Point3::new(6, 1, 2);
        octree.insert(Voxel::new(position, GREEN)).unwrap();
        assert_eq!(octree.node_centers(position).len(), OCTREE_DEPTH);

        assert_eq!(octree.remove(position).map(|v| v.position), Some(position));
        assert!(octree.is_empty());
        assert_eq!(octree.node_centers(position).len(), 1);
        assert_eq!(octree.remove(position), None);
    }

    #[test]
    fn positions_outside_the_tree_are_rejected() {
        let mut octree = chunk_octree();
        let outside = Point3::new(8, 0, 0);
        assert_eq!(
            octree.insert(Voxel::new(outside, GREEN)),
            Err(VoxelError::InsertionFailed { position: outside })
        );
        assert!(octree.is_empty());
        assert!(octree.find(Point3::new(-1, 0, 0)).is_none());
        assert!(octree.node_centers(outside).is_empty());
    }

    #[test]
    fn far_neighbors_get_distinct_leaves() {
        let corner = Point3::new(1 << 24, -(1 << 24), i32::MAX - 7);
        let mut octree = VoxelOctree::new(corner);
        let first = Point3::new(corner.x, corner.y, i32::MAX - 1);
        let second = Point3::new(corner.x + 1, corner.y, i32::MAX);
        octree.insert(Voxel::new(first, GREEN)).unwrap();
        octree
            .insert(Voxel::new(second, VoxelColor::new(1, 1, 1, 255)))
            .unwrap();

        assert_eq!(octree.len(), 2);
        assert_eq!(octree.find(first).map(|v| v.color), Some(GREEN));
        assert_eq!(octree.find(second).map(|v| v.position), Some(second));
    }

    #[test]
    fn missing_voxel_is_not_found() {
        let mut octree = chunk_octree();
        octree.insert(Voxel::new(Point3::new(0, 0, 0), GREEN)).unwrap();
        assert!(octree.find(Point3::new(1, 0, 0)).is_none());
        assert!(octree.find(Point3::new(7, 7, 7)).is_none());
    }
}

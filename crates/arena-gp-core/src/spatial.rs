use crate::arena::Obstacle;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Obstacle footprint keyed by its index in the arena's obstacle list.
#[derive(Clone, Debug)]
pub struct ObstacleExtent {
    pub index: usize,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl RTreeObject for ObstacleExtent {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// Obstacle center point, used for nearest-obstacle queries.
#[derive(Clone, Debug)]
pub struct ObstacleCenter {
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for ObstacleCenter {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for ObstacleCenter {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Static R*-trees over the obstacle set. Built once per arena; geometry never
/// changes afterwards, so the trees are never updated.
#[derive(Clone, Debug)]
pub struct ObstacleIndex {
    extents: RTree<ObstacleExtent>,
    centers: RTree<ObstacleCenter>,
}

impl ObstacleIndex {
    /// Bulk-load both trees (O(n log n)).
    pub fn build(obstacles: &[Obstacle]) -> Self {
        let extents = obstacles
            .iter()
            .enumerate()
            .map(|(index, o)| ObstacleExtent {
                index,
                min: [o.x, o.y],
                max: [o.x + o.width, o.y + o.height],
            })
            .collect();
        let centers = obstacles
            .iter()
            .enumerate()
            .map(|(index, o)| ObstacleCenter {
                index,
                position: o.center(),
            })
            .collect();
        Self {
            extents: RTree::bulk_load(extents),
            centers: RTree::bulk_load(centers),
        }
    }

    /// Indices of obstacles whose bounding box intersects the square around a circle.
    /// Candidates only: callers still run the exact circle test.
    pub fn candidates_near(
        &self,
        center: [f64; 2],
        radius: f64,
    ) -> impl Iterator<Item = usize> + '_ {
        let envelope = AABB::from_corners(
            [center[0] - radius, center[1] - radius],
            [center[0] + radius, center[1] + radius],
        );
        self.extents
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.index)
    }

    /// Index of the obstacle whose center is closest to `point`, with that distance.
    pub fn nearest_center(&self, point: [f64; 2]) -> Option<(usize, f64)> {
        self.centers
            .nearest_neighbor(&point)
            .map(|c| (c.index, c.distance_2(&point).sqrt()))
    }
}

use std::f64::consts::TAU;

use geo::{BoundingRect, Coord, Geometry, Intersects, LineString, Polygon};
use rstar::{RTree, RTreeObject, AABB};

use crate::constants::BUFFER_CIRCLE_SEGMENTS;
use crate::models::{Coordinates, DistanceMeters, PointOfInterest};
use crate::services::projection::LaeaProjection;

/// A POI geometry stored in the R-tree, already in projected metres.
struct IndexedGeometry {
    envelope: AABB<[f64; 2]>,
    geometry: Geometry<f64>,
}

impl RTreeObject for IndexedGeometry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over POI geometries in EPSG:3035.
///
/// Built once per fetched POI set. Counting a buffered point first narrows
/// candidates by bounding box, then runs an exact intersection test against
/// the buffer polygon.
pub struct PoiIndex {
    projection: LaeaProjection,
    tree: RTree<IndexedGeometry>,
}

impl PoiIndex {
    pub fn build(pois: &[PointOfInterest]) -> Self {
        let projection = LaeaProjection::etrs89();
        let entries: Vec<IndexedGeometry> = pois
            .iter()
            .filter_map(|poi| {
                let geometry = projection.project_geometry(&poi.geometry);
                let envelope = compute_envelope(&geometry)?;
                Some(IndexedGeometry { envelope, geometry })
            })
            .collect();

        PoiIndex {
            projection,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Number of POI geometries intersecting a circle of `radius` around
    /// `center`. Always defined; zero when nothing is near.
    pub fn count_within(&self, center: &Coordinates, radius: DistanceMeters) -> u32 {
        let projected = self.projection.project_coordinates(center);
        let r = radius.as_meters();
        let circle = buffer_circle(projected, r);
        let query_env = AABB::from_corners(
            [projected.x - r, projected.y - r],
            [projected.x + r, projected.y + r],
        );

        let hits = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.geometry.intersects(&circle))
            .count();

        u32::try_from(hits).unwrap_or(u32::MAX)
    }
}

/// Regular polygon approximating a circle of `radius` metres around a
/// projected point.
pub fn buffer_circle(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..=BUFFER_CIRCLE_SEGMENTS)
        .map(|i| {
            let theta = TAU * (i % BUFFER_CIRCLE_SEGMENTS) as f64 / BUFFER_CIRCLE_SEGMENTS as f64;
            Coord {
                x: center.x + radius * theta.cos(),
                y: center.y + radius * theta.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

fn compute_envelope(geometry: &Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

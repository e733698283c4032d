//! Geometry helpers for the clustering engine
//!
//! Representative-point synthesis for ski areas without a drawn outline,
//! plus the distance predicates the spatial store builds its nearby queries
//! on. Coordinates are WGS84 lon/lat; distances are Haversine meters.

use geo::{
    Bearing, BoundingRect, Centroid, CoordsIter, Destination, Distance, Geometry,
    GeometryCollection, Haversine, Intersects, Point, Rect,
};

/// Rough meters per degree of latitude, used only to convert metric buffers
/// into index-prefilter envelopes.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// All vertices of a geometry as points.
pub fn geometry_points(geometry: &Geometry<f64>) -> Vec<Point<f64>> {
    geometry.coords_iter().map(Point::from).collect()
}

/// Synthesize a representative point for a cluster of member geometries.
///
/// Takes the centroid of the combined geometry, finds the member vertex
/// nearest to it, and moves `offset_m` meters from that vertex toward the
/// centroid. If the nearest vertex is already within `offset_m` of the
/// centroid, the centroid itself is returned unchanged. The offset keeps
/// the point on or near the actual cluster instead of in the middle of a
/// valley between two ridges.
pub fn representative_point(geometries: &[Geometry<f64>], offset_m: f64) -> Option<Point<f64>> {
    if geometries.is_empty() {
        return None;
    }
    let collection = GeometryCollection(geometries.to_vec());
    let centroid = collection.centroid()?;

    let nearest = geometries
        .iter()
        .flat_map(geometry_points)
        .min_by(|a, b| {
            Haversine::distance(*a, centroid)
                .total_cmp(&Haversine::distance(*b, centroid))
        })?;

    let distance = Haversine::distance(nearest, centroid);
    if distance <= offset_m {
        return Some(centroid);
    }
    let bearing = Haversine::bearing(nearest, centroid);
    Some(Haversine::destination(nearest, bearing, offset_m))
}

/// Minimum Haversine distance in meters between two geometries, measured
/// over their vertices, with an intersection short-circuit. An
/// underestimate of closeness for very long sparse segments, which is
/// acceptable for the buffer radii the engine uses.
pub fn min_distance_m(a: &Geometry<f64>, b: &Geometry<f64>) -> f64 {
    if a.intersects(b) {
        return 0.0;
    }
    let mut min = f64::INFINITY;
    for pa in geometry_points(a) {
        for pb in geometry_points(b) {
            let d = Haversine::distance(pa, pb);
            if d < min {
                min = d;
            }
        }
    }
    min
}

/// Bounding rectangle of a geometry expanded by a metric buffer.
pub fn buffered_bounds(geometry: &Geometry<f64>, buffer_m: f64) -> Option<Rect<f64>> {
    let rect = geometry.bounding_rect()?;
    let degrees = buffer_m / METERS_PER_DEGREE;
    Some(Rect::new(
        (rect.min().x - degrees, rect.min().y - degrees),
        (rect.max().x + degrees, rect.max().y + degrees),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn line(coords: &[(f64, f64)]) -> Geometry<f64> {
        Geometry::LineString(LineString::from(coords.to_vec()))
    }

    #[test]
    fn representative_point_returns_centroid_when_nearby() {
        // Two vertices ~55 m apart: the nearest vertex is well within 100 m
        // of the centroid, so the centroid comes back unchanged.
        let geometry = line(&[(0.0, 0.0), (0.0005, 0.0)]);
        let point = representative_point(&[geometry], 100.0).unwrap();
        assert!((point.x() - 0.00025).abs() < 1e-9);
        assert!(point.y().abs() < 1e-9);
    }

    #[test]
    fn representative_point_offsets_toward_centroid() {
        // A ~11 km segment: nearest vertex is ~5.5 km from the centroid, so
        // the result sits exactly 100 m from that vertex toward the centroid.
        let geometry = line(&[(0.0, 0.0), (0.1, 0.0)]);
        let point = representative_point(&[geometry.clone()], 100.0).unwrap();
        let nearest = Point::new(0.0, 0.0);
        let d = Haversine::distance(point, nearest);
        assert!((d - 100.0).abs() < 0.5, "distance from nearest vertex was {d}");
        // Moved along the segment, not off it
        assert!(point.x() > 0.0 && point.x() < 0.1);
    }

    #[test]
    fn representative_point_empty_input() {
        assert!(representative_point(&[], 100.0).is_none());
    }

    #[test]
    fn min_distance_intersecting_is_zero() {
        let a = line(&[(0.0, 0.0), (1.0, 1.0)]);
        let b = line(&[(0.0, 1.0), (1.0, 0.0)]);
        assert_eq!(min_distance_m(&a, &b), 0.0);
    }

    #[test]
    fn min_distance_between_disjoint_lines() {
        // ~111 m apart along the equator
        let a = line(&[(0.0, 0.0), (0.0, 0.001)]);
        let b = line(&[(0.001, 0.0), (0.001, 0.001)]);
        let d = min_distance_m(&a, &b);
        assert!((d - 111.3).abs() < 1.0, "distance was {d}");
    }
}

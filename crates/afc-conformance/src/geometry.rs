//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Spherical geometry for device location areas.
//!
//! Points live on a sphere of radius [`EARTH_RADIUS_M`]. Edges are great-circle
//! arcs between consecutive polygon vertices.

use serde::{Deserialize, Serialize};

use crate::model::Point;
use crate::validation::Report;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Tolerance for deciding that a point lies on an edge, in meters.
pub const ON_EDGE_EPSILON_M: f64 = 1e-3;

type Vec3 = [f64; 3];

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn normalize(v: Vec3) -> Option<Vec3> {
    let n = norm(v);
    (n > f64::EPSILON).then(|| [v[0] / n, v[1] / n, v[2] / n])
}

fn to_point(v: Vec3) -> Point {
    Point::new(
        v[1].atan2(v[0]).to_degrees(),
        v[2].clamp(-1.0, 1.0).asin().to_degrees(),
    )
}

fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 540.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Great-circle (haversine) distance in meters.
pub fn distance(a: &Point, b: &Point) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (b.longitude - a.longitude).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Point reached by travelling `length_m` along `bearing_deg` (clockwise from north).
pub fn destination(origin: &Point, length_m: f64, bearing_deg: f64) -> Point {
    let delta = length_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.latitude.to_radians();
    let lambda1 = origin.longitude.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    Point::new(wrap_longitude(lambda2.to_degrees()), phi2.to_degrees())
}

/// Great-circle arc between two vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub start: Point,
    pub end: Point,
}

impl Edge {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        distance(&self.start, &self.end)
    }

    /// True when `point` lies on the arc within [`ON_EDGE_EPSILON_M`].
    pub fn contains(&self, point: &Point) -> bool {
        let detour = distance(&self.start, point) + distance(point, &self.end) - self.length();
        detour.abs() <= ON_EDGE_EPSILON_M
    }

    fn has_endpoint(&self, point: &Point) -> bool {
        distance(&self.start, point) <= ON_EDGE_EPSILON_M
            || distance(&self.end, point) <= ON_EDGE_EPSILON_M
    }

    fn normal(&self) -> Option<Vec3> {
        normalize(cross(self.start.as_cartesian(), self.end.as_cartesian()))
    }
}

/// Whether two edges cross or overlap anywhere other than at a shared vertex.
pub fn intersects(a: &Edge, b: &Edge) -> bool {
    let (Some(n1), Some(n2)) = (a.normal(), b.normal()) else {
        return false;
    };
    let shared = |point: &Point| a.has_endpoint(point) && b.has_endpoint(point);

    match normalize(cross(n1, n2)) {
        // Same great circle: overlapping when an unshared endpoint sits on the other edge.
        None => [b.start, b.end]
            .iter()
            .any(|p| !shared(p) && a.contains(p))
            || [a.start, a.end]
                .iter()
                .any(|p| !shared(p) && b.contains(p)),
        Some(line) => {
            let antipode = [-line[0], -line[1], -line[2]];
            [line, antipode].into_iter().map(to_point).any(|candidate| {
                !shared(&candidate) && a.contains(&candidate) && b.contains(&candidate)
            })
        }
    }
}

/// Advisory limits on polygon location areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonLimits {
    pub min_vertices: usize,
    pub max_vertices: usize,
    pub min_spacing_m: f64,
    pub max_spacing_m: f64,
    /// Record violations as errors instead of warnings.
    pub strict: bool,
}

impl Default for PolygonLimits {
    fn default() -> Self {
        Self {
            min_vertices: 3,
            max_vertices: 15,
            min_spacing_m: 1.0,
            max_spacing_m: 155_000.0,
            strict: false,
        }
    }
}

/// Checks vertex count, spacing, self-intersection and duplicates of a closed polygon.
pub fn validate_polygon(vertices: &[Point], limits: &PolygonLimits, report: &mut Report) -> bool {
    let flag = |report: &mut Report, message: String| {
        if limits.strict {
            report.error(message);
        } else {
            report.warning(message);
        }
    };

    report.section(|report| {
        let n = vertices.len();
        if n < limits.min_vertices || n > limits.max_vertices {
            flag(
                report,
                format!(
                    "Polygon has {n} vertices; expected between {} and {}",
                    limits.min_vertices, limits.max_vertices
                ),
            );
        }
        if n < 2 {
            return;
        }

        for i in 0..n {
            let j = (i + 1) % n;
            if n == 2 && j == 0 {
                break;
            }
            let gap = distance(&vertices[i], &vertices[j]);
            if gap < limits.min_spacing_m {
                flag(
                    report,
                    format!(
                        "Consecutive vertices {i} and {j} are {gap:.3} m apart; minimum spacing is {} m",
                        limits.min_spacing_m
                    ),
                );
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let gap = distance(&vertices[i], &vertices[j]);
                if gap > limits.max_spacing_m {
                    flag(
                        report,
                        format!(
                            "Vertices {i} and {j} are {gap:.0} m apart; maximum spacing is {} m",
                            limits.max_spacing_m
                        ),
                    );
                }
                if vertices[i] == vertices[j] {
                    flag(report, format!("Vertices {i} and {j} are duplicates"));
                }
            }
        }

        if n < 4 {
            return;
        }
        let edges: Vec<Edge> = (0..n)
            .map(|i| Edge::new(vertices[i], vertices[(i + 1) % n]))
            .collect();
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                if intersects(&edges[i], &edges[j]) {
                    flag(
                        report,
                        format!(
                            "Polygon edges {i}-{} and {j}-{} intersect",
                            (i + 1) % n,
                            (j + 1) % n
                        ),
                    );
                }
            }
        }
    })
}

//! Spline paths flattened into polylines by adaptive sampling.
//!
//! The flattening follows "Adaptive Sampling of Parametric Curves" by
//! Luiz Henrique de Figueiredo.

use glam::Vec2;

/// The basis used to interpolate between control points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplineType {
    BSpline,
    CatmullRom,
}

/// A sequence of control points, flattened on demand into a polyline.
#[derive(Clone, Debug, Default)]
pub struct SplinePath {
    points: Vec<Vec2>,
    closed: bool,
}

fn gamma_bspline(t: f32, p: &[Vec2; 4]) -> Vec2 {
    let w0 = ((3.0 - t) * t - 3.0) * t + 1.0;
    let w1 = ((3.0 * t - 6.0) * t) * t + 4.0;
    let w2 = ((3.0 - 3.0 * t) * t + 3.0) * t + 1.0;
    let w3 = t * t * t;

    (p[0] * w0 + p[1] * w1 + p[2] * w2 + p[3] * w3) / 6.0
}

fn gamma_catmull_rom(t: f32, p: &[Vec2; 4]) -> Vec2 {
    let w0 = ((2.0 - t) * t - 1.0) * t;
    let w1 = ((3.0 * t - 5.0) * t) * t + 2.0;
    let w2 = ((4.0 - 3.0 * t) * t + 1.0) * t;
    let w3 = (t - 1.0) * t * t;

    (p[0] * w0 + p[1] * w1 + p[2] * w2 + p[3] * w3) / 2.0
}

/// The adaptive sampler requires randomness to avoid aliasing with curve
/// features, but reflattening the same path must produce the same polyline,
/// so each sampler runs its own small fixed-seed generator.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1103515245).wrapping_add(12345);
        ((self.0 >> 16) & 0x7fff) as f32 / 32767.0
    }
}

struct AdaptiveSampler<'a> {
    gamma: fn(f32, &[Vec2; 4]) -> Vec2,
    path: &'a mut Vec<Vec2>,
    tolerance: f32,
    control: [Vec2; 4],
    rng: Lcg,
}

impl<'a> AdaptiveSampler<'a> {
    fn new(
        gamma: fn(f32, &[Vec2; 4]) -> Vec2,
        path: &'a mut Vec<Vec2>,
        tolerance: f32,
    ) -> AdaptiveSampler<'a> {
        AdaptiveSampler {
            gamma,
            path,
            tolerance,
            control: [Vec2::ZERO; 4],
            rng: Lcg(1),
        }
    }

    fn segment(&mut self, p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) {
        self.control = [p0, p1, p2, p3];

        let pt = 0.0;
        let p = (self.gamma)(pt, &self.control);

        let qt = 1.0;
        let q = (self.gamma)(qt, &self.control);

        self.sample(pt, p, qt, q);
    }

    fn sample(&mut self, t0: f32, p0: Vec2, t1: f32, p1: Vec2) {
        let t = 0.45 + 0.1 * self.rng.next();
        let rt = t0 + t * (t1 - t0);
        let r = (self.gamma)(rt, &self.control);

        let cross = (p0 - r).dot(p1 - r);

        if cross * cross < self.tolerance {
            self.path.push(p0);
        } else {
            self.sample(t0, p0, rt, r);
            self.sample(rt, r, t1, p1);
        }
    }
}

impl SplinePath {
    pub fn new() -> SplinePath {
        SplinePath::default()
    }

    pub fn from_points(points: &[Vec2]) -> SplinePath {
        let mut path = SplinePath::new();
        path.add_points(points);
        path
    }

    pub fn add_points(&mut self, points: &[Vec2]) {
        self.points.reserve(points.len());

        for &point in points {
            self.add(point);
        }
    }

    pub fn add(&mut self, point: Vec2) {
        if self.points.last() == Some(&point) {
            return;
        }

        self.points.push(point);
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.closed = false;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn close(&mut self) {
        if self.len() > 2 {
            self.closed = true;

            if self.points.first() == self.points.last() {
                self.points.pop();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Flattens the spline into `path`, keeping the deviation from the true
    /// curve within `tolerance`.
    pub fn flush(&self, spline_type: SplineType, path: &mut Vec<Vec2>, tolerance: f32) {
        let gamma = match spline_type {
            SplineType::BSpline => gamma_bspline,
            SplineType::CatmullRom => gamma_catmull_rom,
        };

        let size = self.points.len();
        if size <= 2 {
            return;
        }

        let points = &self.points;
        let mut aspc = AdaptiveSampler::new(gamma, path, tolerance);

        if self.closed {
            aspc.segment(points[size - 1], points[0], points[1], points[2]);
        } else {
            if spline_type == SplineType::BSpline {
                aspc.segment(points[0], points[0], points[0], points[1]);
            }

            aspc.segment(points[0], points[0], points[1], points[2]);
        }

        for i in 0..size.saturating_sub(3) {
            aspc.segment(points[i], points[i + 1], points[i + 2], points[i + 3]);
        }

        if self.closed {
            aspc.segment(points[size - 3], points[size - 2], points[size - 1], points[0]);
            aspc.segment(points[size - 2], points[size - 1], points[0], points[1]);
        } else {
            aspc.segment(
                points[size - 3],
                points[size - 2],
                points[size - 1],
                points[size - 1],
            );
            aspc.segment(
                points[size - 2],
                points[size - 1],
                points[size - 1],
                points[size - 1],
            );

            if spline_type == SplineType::BSpline {
                aspc.segment(
                    points[size - 1],
                    points[size - 1],
                    points[size - 1],
                    points[size - 1],
                );
            }
        }
    }
}

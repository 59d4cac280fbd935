use glam::Vec2;

use crate::math::Rect;
use crate::path::{SplinePath, SplineType};

/// Controls how offsets outside `0..length` are handled when sampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SamplerMode {
    /// Clamp offsets to the ends of the line.
    Bounded,
    /// Wrap offsets around, for closed lines.
    Loop,
    /// Extrapolate along the first or last segment.
    #[default]
    Tangent,
    /// Wrap offsets around, even for open lines.
    Modulo,
}

/// A sampled point on the line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SamplerValue {
    pub position: Vec2,
    pub angle: f32,
    pub offset: f32,
    pub index: usize,
}

/// The point on the line closest to some query position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClosePoint {
    pub position: Vec2,
    pub offset: f32,
    pub distance: f32,
}

/// A polyline with cumulative segment lengths, supporting sampling of
/// positions and tangent angles at arbitrary arc-length offsets.
#[derive(Clone, Debug, Default)]
pub struct LineSampler {
    mode: SamplerMode,
    points: Vec<Vec2>,
    lengths: Vec<f32>,
}

fn boundf(value: f32, range: f32) -> f32 {
    value.rem_euclid(range)
}

/// Binary search for the segment containing `value`, returning the index of
/// its start point.
fn search(values: &[f32], value: f32, min: usize, max: usize) -> usize {
    let (mut min, mut max) = (min, max);
    let mut mid = (min + max) >> 1;

    while min < mid {
        if values[mid - 1] < value {
            min = mid;
        } else if values[mid - 1] > value {
            max = mid;
        } else {
            min = mid;
            max = mid;
        }
        mid = (min + max) >> 1;
    }

    mid - 1
}

impl LineSampler {
    pub fn new() -> LineSampler {
        LineSampler::default()
    }

    pub fn from_points(points: &[Vec2]) -> LineSampler {
        let mut sampler = LineSampler::new();
        sampler.add_points(points);
        sampler
    }

    pub fn add_points(&mut self, points: &[Vec2]) {
        self.points.reserve(points.len());
        self.lengths.reserve(points.len());

        for &point in points {
            self.add(point);
        }
    }

    pub fn add(&mut self, point: Vec2) {
        if self.points.is_empty() {
            self.lengths.push(0.0);
        } else {
            let delta = point - *self.points.last().unwrap();

            // Ignore zero-length segments
            if delta == Vec2::ZERO {
                return;
            }

            self.lengths.push(self.lengths.last().unwrap() + delta.length());
        }

        self.points.push(point);
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn lengths(&self) -> &[f32] {
        &self.lengths
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.lengths.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total arc length of the line.
    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    pub fn bounds(&self) -> Rect {
        let mut rect = Rect::new(Vec2::MAX, Vec2::MIN);
        for &point in &self.points {
            rect.expand(point);
        }
        rect
    }

    pub fn close(&mut self) {
        if self.len() > 2 && self.points.first() != self.points.last() {
            self.add(self.points[0]);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.len() > 2 && self.points.first() == self.points.last()
    }

    pub fn set_mode(&mut self, mode: SamplerMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> SamplerMode {
        self.mode
    }

    fn apply_mode(&self, offset: f32, length: f32) -> f32 {
        match self.mode {
            SamplerMode::Loop | SamplerMode::Modulo => boundf(offset, length),
            SamplerMode::Bounded => offset.clamp(0.0, length),
            SamplerMode::Tangent => offset,
        }
    }

    pub fn value_at(&self, offset: f32) -> SamplerValue {
        let length = self.length();
        if length <= 0.0 {
            return SamplerValue::default();
        }

        let offset = self.apply_mode(offset, length);
        let index = search(&self.lengths, offset, 1, self.len());

        let p0 = self.points[index];
        let p1 = self.points[index + 1];

        let ratio = (offset - self.lengths[index]) / (self.lengths[index + 1] - self.lengths[index]);

        SamplerValue {
            position: p0 + (p1 - p0) * ratio,
            angle: (p1.y - p0.y).atan2(p1.x - p0.x),
            offset,
            index,
        }
    }

    /// Samples the position and tangent angle at `offset`, or `None` for an
    /// empty line.
    pub fn get(&self, offset: f32) -> Option<(Vec2, f32)> {
        let length = self.length();
        if length <= 0.0 {
            return None;
        }

        let value = self.value_at(offset);
        Some((value.position, value.angle))
    }

    pub fn position_at(&self, offset: f32) -> Vec2 {
        self.value_at(offset).position
    }

    pub fn angle_at(&self, offset: f32) -> f32 {
        self.value_at(offset).angle
    }

    /// Like [`angle_at`](Self::angle_at), but averaged over a window of
    /// `sample_size` to smooth out corners between segments.
    pub fn sampled_angle_at(&self, offset: f32, sample_size: f32) -> f32 {
        let gradient = self.gradient_at(offset, sample_size);

        // Degenerate gradients occur close to 180 degree turns
        if gradient.length_squared() > 1.0 {
            gradient.y.atan2(gradient.x)
        } else {
            self.angle_at(offset)
        }
    }

    pub fn gradient_at(&self, offset: f32, sample_size: f32) -> Vec2 {
        let pm = self.position_at(offset - sample_size * 0.5);
        let pp = self.position_at(offset + sample_size * 0.5);

        (pp - pm) * 0.5
    }

    /// Finds the point on the line closest to `input`, unless it is farther
    /// away than `threshold`.
    pub fn find_closest_point(&self, input: Vec2, threshold: f32) -> Option<ClosePoint> {
        if self.len() < 2 {
            return None;
        }

        let mut sq_min = threshold * threshold;

        let end = self.len();
        let mut result = None;

        for i in 0..end {
            let (i0, i1) = if i == end - 1 { (i - 1, i) } else { (i, i + 1) };

            let p0 = self.points[i0];
            let p1 = self.points[i1];

            let delta = p1 - p0;
            let length = self.lengths[i1] - self.lengths[i0];
            let u = delta.dot(input - p0) / (length * length);

            if (0.0..=1.0).contains(&u) {
                let p = p0 + u * delta;
                let mag = (p - input).length_squared();

                if mag < sq_min {
                    sq_min = mag;
                    result = Some((p, self.lengths[i0] + u * length));
                }
            } else {
                let mag0 = (p0 - input).length_squared();
                let mag1 = (p1 - input).length_squared();

                if mag0 < sq_min && mag0 < mag1 {
                    sq_min = mag0;
                    result = Some((p0, self.lengths[i0]));
                } else if mag1 < sq_min && mag1 < mag0 {
                    sq_min = mag1;
                    result = Some((p1, self.lengths[i1]));
                }
            }
        }

        result.map(|(position, offset)| ClosePoint {
            position,
            offset,
            distance: sq_min.sqrt(),
        })
    }

    pub fn closest_point_on_segment(&self, input: Vec2, segment: usize) -> Option<ClosePoint> {
        if segment + 1 >= self.len() {
            return None;
        }

        let p0 = self.points[segment];
        let p1 = self.points[segment + 1];

        let delta = p1 - p0;
        let length = self.lengths[segment + 1] - self.lengths[segment];
        let u = delta.dot(input - p0) / (length * length);

        if (0.0..=1.0).contains(&u) {
            let p = p0 + u * delta;
            Some(ClosePoint {
                position: p,
                offset: self.lengths[segment] + u * length,
                distance: (p - input).length(),
            })
        } else {
            let mag0 = (p0 - input).length_squared();
            let mag1 = (p1 - input).length_squared();

            if mag0 < mag1 {
                Some(ClosePoint {
                    position: p0,
                    offset: self.lengths[segment],
                    distance: mag0.sqrt(),
                })
            } else {
                Some(ClosePoint {
                    position: p1,
                    offset: self.lengths[segment + 1],
                    distance: mag1.sqrt(),
                })
            }
        }
    }

    /// Replaces the contents of the sampler with a flattened spline.
    pub fn sample_spline(&mut self, path: &SplinePath, spline_type: SplineType, tolerance: f32) {
        self.points.clear();
        self.lengths.clear();

        path.flush(spline_type, &mut self.points, tolerance);

        if self.points.len() < 2 {
            return;
        }

        self.lengths.push(0.0);

        let mut i = 1;
        while i < self.points.len() {
            let delta = self.points[i] - self.points[i - 1];

            // Ignore zero-length segments
            if delta == Vec2::ZERO {
                self.points.remove(i);
                continue;
            }

            self.lengths.push(self.lengths.last().unwrap() + delta.length());
            i += 1;
        }

        if path.is_closed() {
            self.close();
            self.set_mode(SamplerMode::Loop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_along_segments() {
        let sampler = LineSampler::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
        ]);

        assert_eq!(sampler.length(), 20.0);

        let (position, angle) = sampler.get(5.0).unwrap();
        assert_eq!(position, Vec2::new(5.0, 0.0));
        assert_eq!(angle, 0.0);

        let (position, angle) = sampler.get(15.0).unwrap();
        assert_eq!(position, Vec2::new(10.0, 5.0));
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn zero_length_segments_are_dropped() {
        let mut sampler = LineSampler::new();
        sampler.add(Vec2::new(0.0, 0.0));
        sampler.add(Vec2::new(0.0, 0.0));
        sampler.add(Vec2::new(4.0, 0.0));

        assert_eq!(sampler.len(), 2);
        assert_eq!(sampler.length(), 4.0);
    }

    #[test]
    fn bounded_mode_clamps() {
        let mut sampler =
            LineSampler::from_points(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]);
        sampler.set_mode(SamplerMode::Bounded);

        assert_eq!(sampler.position_at(-5.0), Vec2::new(0.0, 0.0));
        assert_eq!(sampler.position_at(25.0), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn loop_mode_wraps() {
        let mut sampler = LineSampler::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]);
        sampler.close();
        sampler.set_mode(SamplerMode::Loop);

        assert!(sampler.is_closed());
        assert_eq!(sampler.position_at(45.0), sampler.position_at(5.0));
    }

    #[test]
    fn closest_point() {
        let sampler =
            LineSampler::from_points(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]);

        let close = sampler.find_closest_point(Vec2::new(4.0, 3.0), 5.0).unwrap();
        assert_eq!(close.position, Vec2::new(4.0, 0.0));
        assert_eq!(close.offset, 4.0);
        assert!((close.distance - 3.0).abs() < 1e-6);

        assert!(sampler.find_closest_point(Vec2::new(4.0, 30.0), 5.0).is_none());
    }

    #[test]
    fn empty_sampler_yields_nothing() {
        let sampler = LineSampler::new();
        assert!(sampler.get(0.0).is_none());
        assert_eq!(sampler.length(), 0.0);
    }

    #[test]
    fn closest_point_needs_a_segment() {
        let empty = LineSampler::new();
        assert!(empty.find_closest_point(Vec2::ZERO, 5.0).is_none());

        // A single point has no segment to project onto
        let point = LineSampler::from_points(&[Vec2::new(1.0, 1.0)]);
        assert!(point.find_closest_point(Vec2::new(1.0, 1.0), 5.0).is_none());
        assert!(point.closest_point_on_segment(Vec2::ZERO, 0).is_none());
    }
}

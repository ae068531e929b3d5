//! Human-like pointer paths
//!
//! A path follows the Flash-Hogan minimum-jerk profile along the straight
//! line to the target, slow at both ends and fastest in the middle:
//!
//! ```text
//! s(τ) = 10τ³ - 15τ⁴ + 6τ⁵,   τ ∈ [0, 1]
//! ```
//!
//! A sideways bow of `deviation * distance * sin(πτ)` keeps it from being
//! perfectly straight. Duration grows with distance within configured
//! bounds and is split into steps at the configured rate.
//!
//! When the screen is known the path never leaves it. The bow bends toward
//! the interior if its apex would fall off-screen, and any point still
//! outside is clamped to the nearest edge pixel. Moves along an edge stay
//! on that edge.

use std::f64::consts::PI;
use std::time::Duration;

use crate::config::ActuatorConfig;
use crate::cursor::ScreenBounds;

/// Distances below this are not worth a path (pixels)
const MIN_DISTANCE: f64 = 0.5;

/// Movement shaping parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MotionProfile {
    /// Steps per second
    pub fps: u32,
    /// Shortest path duration
    pub min_duration: Duration,
    /// Longest path duration
    pub max_duration: Duration,
    /// Duration per pixel of distance (ms)
    pub ms_per_pixel: f64,
    /// Bow as a fraction of distance
    pub deviation: f64,
    /// Screen every planned point must stay on
    pub bounds: Option<ScreenBounds>,
}

impl MotionProfile {
    /// Confine planned paths to `bounds`
    pub fn with_bounds(mut self, bounds: ScreenBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self::from(&ActuatorConfig::default())
    }
}

impl From<&ActuatorConfig> for MotionProfile {
    fn from(config: &ActuatorConfig) -> Self {
        Self {
            fps: config.fps.max(1),
            min_duration: Duration::from_millis(config.min_duration_ms),
            max_duration: Duration::from_millis(config.max_duration_ms),
            ms_per_pixel: config.ms_per_pixel,
            deviation: config.deviation,
            bounds: None,
        }
    }
}

/// Planned pointer path
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Pixel positions to visit, ending at the target
    pub points: Vec<(i32, i32)>,
    /// Delay before each point
    pub step: Duration,
}

impl Trajectory {
    /// True when there is nothing to move
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total time the path takes
    pub fn duration(&self) -> Duration {
        self.step * self.points.len() as u32
    }
}

/// Minimum-jerk position fraction at normalized time `t`
fn min_jerk(t: f64) -> f64 {
    let t3 = t * t * t;
    t3 * (10.0 - 15.0 * t + 6.0 * t * t)
}

/// Plan a path from `from` to `to`
pub fn plan(from: (f64, f64), to: (f64, f64), profile: &MotionProfile) -> Trajectory {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let distance = dx.hypot(dy);
    let target = (to.0.round() as i32, to.1.round() as i32);

    let fps = profile.fps.max(1);
    if distance < MIN_DISTANCE {
        let start = (from.0.round() as i32, from.1.round() as i32);
        let points = if start == target { Vec::new() } else { vec![target] };
        return Trajectory {
            points,
            step: Duration::from_secs(1) / fps,
        };
    }

    let duration = Duration::try_from_secs_f64(distance * profile.ms_per_pixel / 1000.0)
        .unwrap_or(profile.max_duration)
        .clamp(profile.min_duration, profile.max_duration.max(profile.min_duration));

    let steps = ((duration.as_secs_f64() * fps as f64).ceil() as usize).max(1);
    let step = duration / steps as u32;

    // Unit normal to the direction of travel
    let (mut nx, mut ny) = (-dy / distance, dx / distance);
    let bow = profile.deviation * distance;

    if let Some(bounds) = &profile.bounds {
        let (mid_x, mid_y) = (from.0 + dx * 0.5, from.1 + dy * 0.5);
        if !bounds.contains(mid_x + nx * bow, mid_y + ny * bow)
            && bounds.contains(mid_x - nx * bow, mid_y - ny * bow)
        {
            nx = -nx;
            ny = -ny;
        }
    }

    let mut points: Vec<(i32, i32)> = Vec::with_capacity(steps);
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let (x, y) = if i == steps {
            to
        } else {
            let s = min_jerk(t);
            let offset = bow * (PI * t).sin();
            (from.0 + dx * s + nx * offset, from.1 + dy * s + ny * offset)
        };
        let (x, y) = match &profile.bounds {
            Some(bounds) => bounds.clamp(x, y),
            None => (x, y),
        };
        let point = (x.round() as i32, y.round() as i32);

        if points.last() != Some(&point) {
            points.push(point);
        }
    }

    Trajectory { points, step }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight() -> MotionProfile {
        MotionProfile {
            deviation: 0.0,
            ..MotionProfile::default()
        }
    }

    #[test]
    fn test_min_jerk_endpoints() {
        assert_eq!(min_jerk(0.0), 0.0);
        assert!((min_jerk(1.0) - 1.0).abs() < 1e-12);
        assert!((min_jerk(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_path_ends_at_target() {
        let path = plan((100.0, 100.0), (400.0, 250.0), &MotionProfile::default());
        assert!(!path.is_empty());
        assert_eq!(*path.points.last().unwrap(), (400, 250));
    }

    #[test]
    fn test_no_path_when_already_there() {
        let path = plan((10.0, 10.0), (10.2, 9.9), &MotionProfile::default());
        assert!(path.is_empty());
    }

    #[test]
    fn test_tiny_move_is_single_step() {
        let path = plan((10.0, 10.0), (10.4, 10.6), &MotionProfile::default());
        assert_eq!(path.points, vec![(10, 11)]);
    }

    #[test]
    fn test_duration_scales_with_distance_within_bounds() {
        let profile = MotionProfile {
            fps: 100,
            min_duration: Duration::from_millis(20),
            max_duration: Duration::from_millis(200),
            ms_per_pixel: 1.0,
            deviation: 0.0,
            bounds: None,
        };

        let short = plan((0.0, 0.0), (5.0, 0.0), &profile);
        let medium = plan((0.0, 0.0), (100.0, 0.0), &profile);
        let long = plan((0.0, 0.0), (1000.0, 0.0), &profile);

        assert!(short.duration() <= Duration::from_millis(25));
        assert!(medium.duration() > short.duration());
        assert!(long.duration() <= Duration::from_millis(200));
        assert!(long.duration() >= medium.duration());
    }

    #[test]
    fn test_velocity_profile_is_slow_at_ends() {
        let profile = MotionProfile {
            fps: 100,
            min_duration: Duration::from_millis(100),
            max_duration: Duration::from_millis(100),
            ..straight()
        };
        let path = plan((0.0, 0.0), (1000.0, 0.0), &profile);
        let xs: Vec<i32> = path.points.iter().map(|p| p.0).collect();

        let first_step = xs[0];
        let mid = xs.len() / 2;
        let mid_step = xs[mid] - xs[mid - 1];
        assert!(mid_step > first_step * 5);

        // Monotonic along a straight path
        assert!(xs.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_deviation_bows_path() {
        let profile = MotionProfile {
            deviation: 0.1,
            min_duration: Duration::from_millis(300),
            ..MotionProfile::default()
        };
        let path = plan((0.0, 500.0), (1000.0, 500.0), &profile);

        let max_offset = path.points.iter().map(|p| (p.1 - 500).abs()).max().unwrap();
        assert!(max_offset > 50);
        assert!(max_offset <= 101);
        assert_eq!(*path.points.last().unwrap(), (1000, 500));
    }

    fn on_screen(path: &Trajectory, bounds: ScreenBounds) -> bool {
        path.points
            .iter()
            .all(|&(x, y)| bounds.contains(x as f64, y as f64))
    }

    #[test]
    fn test_bow_ignores_screen_without_bounds() {
        let path = plan((900.0, 0.0), (100.0, 0.0), &MotionProfile::default());
        assert!(path.points.iter().any(|p| p.1 < 0));
    }

    #[test]
    fn test_edge_moves_stay_on_screen() {
        let bounds = ScreenBounds::new(1000, 800);
        let profile = MotionProfile::default().with_bounds(bounds);

        let moves = [
            ((900.0, 0.0), (100.0, 0.0)),
            ((100.0, 0.0), (900.0, 0.0)),
            ((100.0, 799.0), (900.0, 799.0)),
            ((900.0, 799.0), (100.0, 799.0)),
            ((0.0, 700.0), (0.0, 100.0)),
            ((0.0, 100.0), (0.0, 700.0)),
            ((999.0, 100.0), (999.0, 700.0)),
            ((999.0, 700.0), (999.0, 100.0)),
        ];
        for (from, to) in moves {
            let path = plan(from, to, &profile);
            assert!(on_screen(&path, bounds), "{:?} -> {:?} left the screen", from, to);
            assert_eq!(*path.points.last().unwrap(), (to.0 as i32, to.1 as i32));
        }
    }

    #[test]
    fn test_bow_flips_toward_interior() {
        let bounds = ScreenBounds::new(1000, 800);
        let profile = MotionProfile {
            deviation: 0.1,
            ..MotionProfile::default()
        }
        .with_bounds(bounds);

        // Leftward along y = 20: the natural bow points up and off-screen
        let path = plan((900.0, 20.0), (100.0, 20.0), &profile);
        let max_y = path.points.iter().map(|p| p.1).max().unwrap();
        assert!(max_y > 60);
        assert!(on_screen(&path, bounds));
    }

    #[test]
    fn test_corner_to_corner_is_clamped() {
        let bounds = ScreenBounds::new(200, 100);
        let profile = MotionProfile {
            deviation: 0.5,
            ..MotionProfile::default()
        }
        .with_bounds(bounds);

        let path = plan((0.0, 0.0), (199.0, 0.0), &profile);
        assert!(on_screen(&path, bounds));
        assert_eq!(*path.points.last().unwrap(), (199, 0));
    }
}

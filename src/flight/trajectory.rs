use bevy::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointType {
    Normal,
    TouchGround,
    SpeedBar,
    Ears,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub position: Vec3,
    pub point_type: PointType,
}

/// Append-only flight history in recording order.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder {
    points: Vec<TrajectoryPoint>,
}

impl TrajectoryRecorder {
    pub fn record(&mut self, position: Vec3, point_type: PointType) {
        self.points.push(TrajectoryPoint {
            position,
            point_type,
        });
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First ground contact, used to frame the post-crash view.
    pub fn first_touch_ground(&self) -> Option<&TrajectoryPoint> {
        self.points
            .iter()
            .find(|point| point.point_type == PointType::TouchGround)
    }

    pub fn max_altitude(&self) -> Option<f32> {
        self.points
            .iter()
            .map(|point| point.position.y)
            .reduce(f32::max)
    }
}

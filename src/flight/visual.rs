use super::shared::Shared;

/// Arm pose shown on the glider model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PilotPose {
    #[default]
    HandsUp,
    BreakLeft,
    BreakRight,
}

/// Visual feedback for break inputs, implemented by whatever draws the pilot.
pub trait FlyableVisual: Send + Sync {
    fn break_left(&mut self);
    fn break_right(&mut self);
    fn hands_up(&mut self);
}

/// Used when nothing draws the pilot.
#[derive(Debug, Default)]
pub struct NoVisual;

impl FlyableVisual for NoVisual {
    fn break_left(&mut self) {}
    fn break_right(&mut self) {}
    fn hands_up(&mut self) {}
}

/// Stores the requested pose for a renderer to pick up.
#[derive(Debug, Clone, Default)]
pub struct SharedPilotPose(pub Shared<PilotPose>);

impl SharedPilotPose {
    pub fn current(&self) -> PilotPose {
        *self.0.read()
    }
}

impl FlyableVisual for SharedPilotPose {
    fn break_left(&mut self) {
        *self.0.write() = PilotPose::BreakLeft;
    }

    fn break_right(&mut self) {
        *self.0.write() = PilotPose::BreakRight;
    }

    fn hands_up(&mut self) {
        *self.0.write() = PilotPose::HandsUp;
    }
}

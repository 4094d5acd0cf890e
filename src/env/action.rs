/// Number of discrete box actions
pub const NUM_ACTIONS: usize = 9;

/// Transformation applied to the current bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxAction {
    Right,
    Left,
    Up,
    Down,
    /// Grow both sides
    Bigger,
    /// Shrink both sides
    Smaller,
    /// Reduce height, keeping width
    Fatter,
    /// Reduce width, keeping height
    Taller,
    /// Commit to the current box and end the episode
    Trigger,
}

impl BoxAction {
    /// All actions in index order
    pub const ALL: [BoxAction; NUM_ACTIONS] = [
        BoxAction::Right,
        BoxAction::Left,
        BoxAction::Up,
        BoxAction::Down,
        BoxAction::Bigger,
        BoxAction::Smaller,
        BoxAction::Fatter,
        BoxAction::Taller,
        BoxAction::Trigger,
    ];

    /// Convert a discrete action index to a box action
    ///
    /// Returns `None` for indices outside `0..NUM_ACTIONS`.
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Discrete index of this action
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns the box deltas `(dx0, dy0, dx1, dy1)` for a box of size `w x h`
    ///
    /// `alpha` is the fraction of the box size moved per step.
    pub fn deltas(&self, w: f32, h: f32, alpha: f32) -> (f32, f32, f32, f32) {
        let aw = alpha * w;
        let ah = alpha * h;
        match self {
            BoxAction::Right => (aw, 0.0, aw, 0.0),
            BoxAction::Left => (-aw, 0.0, -aw, 0.0),
            BoxAction::Up => (0.0, -ah, 0.0, -ah),
            BoxAction::Down => (0.0, ah, 0.0, ah),
            BoxAction::Bigger => (-aw / 2.0, -ah / 2.0, aw / 2.0, ah / 2.0),
            BoxAction::Smaller => (aw / 2.0, ah / 2.0, -aw / 2.0, -ah / 2.0),
            BoxAction::Fatter => (0.0, ah / 2.0, 0.0, -ah / 2.0),
            BoxAction::Taller => (aw / 2.0, 0.0, -aw / 2.0, 0.0),
            BoxAction::Trigger => (0.0, 0.0, 0.0, 0.0),
        }
    }
}

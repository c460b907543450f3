use crate::{ConfigError, Span, VisibilityOptions};

/// Identity of the boundary element a trigger observes (e.g. a list's trailing sentinel).
pub type BoundaryId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Emitted once per change of a boundary's visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibilityTransition {
    pub boundary: BoundaryId,
    pub to: Visibility,
}

impl VisibilityTransition {
    pub fn became_visible(&self) -> bool {
        self.to.is_visible()
    }
}

/// Fraction of `boundary` inside `root`, or `None` when the intersection is empty.
///
/// Spans that only share an edge do not intersect. An empty boundary that lies within the root
/// (edges included) counts as fully visible, so zero-height sentinels still trigger.
pub fn intersection_ratio(boundary: Span, root: Span) -> Option<f32> {
    let start = boundary.start.max(root.start);
    let end = boundary.end.min(root.end);
    if start > end {
        return None;
    }
    let len = boundary.len();
    if len == 0 {
        return Some(1.0);
    }
    if start == end {
        return None;
    }
    Some((end.abs_diff(start) as f64 / len as f64) as f32)
}

/// Edge-triggered visibility tracking for a single boundary.
///
/// The trigger is a two-state machine (`Hidden`/`Visible`). Observations that do not change the
/// state produce nothing, so repeated observer callbacks for the same state never cause
/// duplicate loads.
#[derive(Clone, Debug)]
pub struct VisibilityTrigger {
    options: VisibilityOptions,
    boundary: Option<BoundaryId>,
    state: Visibility,
}

impl VisibilityTrigger {
    pub fn new(options: VisibilityOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            boundary: None,
            state: Visibility::Hidden,
        })
    }

    pub fn options(&self) -> &VisibilityOptions {
        &self.options
    }

    /// Starts observing `boundary`. Re-arming on a new boundary starts over from `Hidden`.
    pub fn arm(&mut self, boundary: BoundaryId) {
        pdebug!(boundary, "VisibilityTrigger::arm");
        self.boundary = Some(boundary);
        self.state = Visibility::Hidden;
    }

    /// Stops observing immediately. Nothing is emitted until the trigger is re-armed.
    pub fn disarm(&mut self) {
        pdebug!(boundary = ?self.boundary, "VisibilityTrigger::disarm");
        self.boundary = None;
        self.state = Visibility::Hidden;
    }

    pub fn is_armed(&self) -> bool {
        self.boundary.is_some()
    }

    pub fn boundary(&self) -> Option<BoundaryId> {
        self.boundary
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    /// Feeds an intersection ratio (as an intersection observer reports it).
    ///
    /// A ratio of zero never counts as visible, even with a zero threshold.
    pub fn observe_ratio(&mut self, ratio: f32) -> Option<VisibilityTransition> {
        let visible = ratio > 0.0 && ratio >= self.options.threshold;
        self.set_state(visible)
    }

    /// Feeds boundary and root geometry on the scroll axis.
    ///
    /// The root is expanded by `root_margin` before intersecting.
    pub fn observe_geometry(&mut self, boundary: Span, root: Span) -> Option<VisibilityTransition> {
        let root = root.expand(self.options.root_margin);
        let visible = match intersection_ratio(boundary, root) {
            Some(ratio) => ratio >= self.options.threshold,
            None => false,
        };
        self.set_state(visible)
    }

    fn set_state(&mut self, visible: bool) -> Option<VisibilityTransition> {
        let boundary = self.boundary?;
        let next = if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        if next == self.state {
            return None;
        }
        ptrace!(boundary, ?next, "VisibilityTrigger transition");
        self.state = next;
        Some(VisibilityTransition { boundary, to: next })
    }
}

// Drag controller - One move/resize gesture at a time with preview/commit separation
use crate::application::geometry::{clamp_move, clamp_resize, GridMetrics};
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::layout::GridLayout;
use crate::domain::widget::WidgetId;

pub type PointerId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize,
}

/// Lives only while a gesture is active.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub widget_id: WidgetId,
    pub pointer_id: PointerId,
    pub mode: DragMode,
    pub start: PointerPosition,
    pub orig_layout: GridLayout,
    pub preview: GridLayout,
}

/// Layout to write into the store when a gesture ends.
#[derive(Debug, Clone, PartialEq)]
pub struct DragCommit {
    pub widget_id: WidgetId,
    pub layout: GridLayout,
}

#[derive(Debug, Default)]
pub struct DragController {
    active: Option<DragState>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `pointer_id` for a gesture on `widget_id`. Rejected while any
    /// other gesture holds the capture.
    pub fn begin(
        &mut self,
        pointer_id: PointerId,
        widget_id: WidgetId,
        mode: DragMode,
        start: PointerPosition,
        orig_layout: GridLayout,
    ) -> DashboardResult<()> {
        if let Some(active) = &self.active {
            tracing::debug!(
                "Rejecting drag on {} - gesture on {} still active",
                widget_id,
                active.widget_id
            );
            return Err(DashboardError::GestureActive(active.widget_id.clone()));
        }

        self.active = Some(DragState {
            widget_id,
            pointer_id,
            mode,
            start,
            orig_layout,
            preview: orig_layout,
        });
        Ok(())
    }

    /// Recompute the preview for a pointer move. Moves from pointers other
    /// than the captured one are ignored.
    pub fn update(
        &mut self,
        pointer_id: PointerId,
        position: PointerPosition,
        metrics: &GridMetrics,
    ) -> Option<GridLayout> {
        let state = self.active.as_mut().filter(|s| s.pointer_id == pointer_id)?;
        let (dx, dy) = metrics.delta_cells(position.x - state.start.x, position.y - state.start.y);
        state.preview = match state.mode {
            DragMode::Move => clamp_move(state.orig_layout, dx, dy, metrics.cols),
            DragMode::Resize => clamp_resize(state.orig_layout, dx, dy, metrics.cols),
        };
        Some(state.preview)
    }

    /// Release the capture and hand back the last preview for committing.
    pub fn end(&mut self, pointer_id: PointerId) -> Option<DragCommit> {
        if !self.is_captured_by(pointer_id) {
            return None;
        }
        self.active.take().map(|state| DragCommit {
            widget_id: state.widget_id,
            layout: state.preview,
        })
    }

    /// Drop the gesture without producing a commit.
    pub fn cancel(&mut self) -> Option<DragState> {
        let discarded = self.active.take();
        if let Some(state) = &discarded {
            tracing::debug!("Drag on {} cancelled", state.widget_id);
        }
        discarded
    }

    /// Cancel only if `pointer_id` owns the active gesture (pointer lost).
    pub fn cancel_pointer(&mut self, pointer_id: PointerId) -> Option<DragState> {
        if self.is_captured_by(pointer_id) {
            self.cancel()
        } else {
            None
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&DragState> {
        self.active.as_ref()
    }

    pub fn preview_for(&self, widget_id: &WidgetId) -> Option<GridLayout> {
        self.active
            .as_ref()
            .filter(|s| &s.widget_id == widget_id)
            .map(|s| s.preview)
    }

    fn is_captured_by(&self, pointer_id: PointerId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.pointer_id == pointer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> GridMetrics {
        // 100px columns, 60px rows
        GridMetrics::new(1190.0, 12, 10.0, 50.0)
    }

    #[test]
    fn test_move_preview_then_commit() {
        let mut drag = DragController::new();
        let orig = GridLayout::new(0, 0, 4, 3);
        drag.begin(1, "w1".into(), DragMode::Move, PointerPosition::new(10.0, 10.0), orig)
            .unwrap();

        let preview = drag.update(1, PointerPosition::new(215.0, 135.0), &metrics());
        assert_eq!(preview, Some(GridLayout::new(2, 2, 4, 3)));
        assert_eq!(drag.preview_for(&"w1".into()), Some(GridLayout::new(2, 2, 4, 3)));

        let commit = drag.end(1).unwrap();
        assert_eq!(commit.widget_id, WidgetId::from("w1"));
        assert_eq!(commit.layout, GridLayout::new(2, 2, 4, 3));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_small_jitter_keeps_origin() {
        let mut drag = DragController::new();
        let orig = GridLayout::new(3, 1, 2, 2);
        drag.begin(1, "w1".into(), DragMode::Move, PointerPosition::new(0.0, 0.0), orig)
            .unwrap();
        assert_eq!(drag.update(1, PointerPosition::new(40.0, -25.0), &metrics()), Some(orig));
    }

    #[test]
    fn test_resize_clamped_to_grid() {
        let mut drag = DragController::new();
        let orig = GridLayout::new(9, 0, 4, 3);
        drag.begin(7, "w1".into(), DragMode::Resize, PointerPosition::new(0.0, 0.0), orig)
            .unwrap();
        let preview = drag.update(7, PointerPosition::new(200.0, 0.0), &metrics());
        assert_eq!(preview, Some(GridLayout::new(9, 0, 3, 3)));
    }

    #[test]
    fn test_second_gesture_rejected() {
        let mut drag = DragController::new();
        let layout = GridLayout::default();
        drag.begin(1, "w1".into(), DragMode::Move, PointerPosition::new(0.0, 0.0), layout)
            .unwrap();
        let err = drag
            .begin(2, "w2".into(), DragMode::Resize, PointerPosition::new(0.0, 0.0), layout)
            .unwrap_err();
        assert_eq!(err, DashboardError::GestureActive("w1".into()));
        assert_eq!(drag.active().map(|s| s.pointer_id), Some(1));
    }

    #[test]
    fn test_foreign_pointer_ignored() {
        let mut drag = DragController::new();
        let layout = GridLayout::default();
        drag.begin(1, "w1".into(), DragMode::Move, PointerPosition::new(0.0, 0.0), layout)
            .unwrap();
        assert_eq!(drag.update(2, PointerPosition::new(500.0, 0.0), &metrics()), None);
        assert_eq!(drag.end(2), None);
        assert!(drag.cancel_pointer(2).is_none());
        assert!(drag.is_dragging());
    }

    #[test]
    fn test_cancel_discards_preview() {
        let mut drag = DragController::new();
        let orig = GridLayout::default();
        drag.begin(1, "w1".into(), DragMode::Move, PointerPosition::new(0.0, 0.0), orig)
            .unwrap();
        drag.update(1, PointerPosition::new(300.0, 0.0), &metrics());
        let discarded = drag.cancel_pointer(1).unwrap();
        assert_eq!(discarded.orig_layout, orig);
        assert!(drag.end(1).is_none());
        assert!(drag.preview_for(&"w1".into()).is_none());
    }
}

// Canvas view model - Pointer input in, positioned widget frames out
use crate::application::dashboard_store::{DashboardStore, DataStatus};
use crate::application::drag_controller::{DragController, DragMode, PointerId, PointerPosition};
use crate::application::geometry::{GridMetrics, PixelRect};
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::layout::GridLayout;
use crate::domain::widget::{WidgetId, WidgetType};
use crate::infrastructure::config::GridSettings;

/// Everything a renderer needs to draw one widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetFrame {
    pub id: WidgetId,
    pub kind: WidgetType,
    pub title: String,
    pub layout: GridLayout,
    pub rect: PixelRect,
    pub previewing: bool,
    pub selected: bool,
    pub status: DataStatus,
}

pub struct CanvasView {
    settings: GridSettings,
    metrics: GridMetrics,
    drag: DragController,
}

impl CanvasView {
    pub fn new(settings: GridSettings, grid_cols: u32) -> Self {
        let metrics = GridMetrics::new(
            settings.container_width_px,
            grid_cols,
            settings.gap_px,
            settings.row_height_px,
        );
        Self {
            settings,
            metrics,
            drag: DragController::new(),
        }
    }

    pub fn metrics(&self) -> GridMetrics {
        self.metrics
    }

    /// Recompute cell pitches after the container or column count changed.
    pub fn resize(&mut self, container_width_px: f64, grid_cols: u32) {
        self.settings.container_width_px = container_width_px;
        self.metrics = GridMetrics::new(
            container_width_px,
            grid_cols,
            self.settings.gap_px,
            self.settings.row_height_px,
        );
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Start a move or resize on a widget and select it.
    pub fn pointer_down(
        &mut self,
        store: &mut DashboardStore,
        pointer_id: PointerId,
        widget_id: &WidgetId,
        mode: DragMode,
        position: PointerPosition,
    ) -> DashboardResult<()> {
        let widget = store
            .widget(widget_id)
            .ok_or_else(|| DashboardError::UnknownWidget(widget_id.clone()))?;
        if store.grid_cols() != self.metrics.cols {
            self.resize(self.settings.container_width_px, store.grid_cols());
        }
        self.drag
            .begin(pointer_id, widget.id.clone(), mode, position, widget.layout)?;
        store.select_widget(widget_id)
    }

    pub fn pointer_move(&mut self, pointer_id: PointerId, position: PointerPosition) -> Option<GridLayout> {
        self.drag.update(pointer_id, position, &self.metrics)
    }

    /// Release: the last preview becomes the stored layout.
    pub fn pointer_up(
        &mut self,
        store: &mut DashboardStore,
        pointer_id: PointerId,
    ) -> DashboardResult<Option<GridLayout>> {
        let Some(commit) = self.drag.end(pointer_id) else {
            return Ok(None);
        };
        store.update_widget_layout(&commit.widget_id, commit.layout)?;
        Ok(Some(commit.layout))
    }

    /// Pointer lost or gesture aborted; the store is not touched.
    pub fn pointer_cancel(&mut self, pointer_id: PointerId) {
        self.drag.cancel_pointer(pointer_id);
    }

    /// Drop any gesture on a widget that is going away.
    pub fn forget_widget(&mut self, widget_id: &WidgetId) {
        if self.drag.active().is_some_and(|s| &s.widget_id == widget_id) {
            self.drag.cancel();
        }
    }

    pub fn frames(&self, store: &DashboardStore) -> Vec<WidgetFrame> {
        let selected = store.selected_widget();
        store
            .widgets()
            .into_iter()
            .map(|widget| {
                let preview = self.drag.preview_for(&widget.id);
                let layout = preview.unwrap_or(widget.layout);
                WidgetFrame {
                    status: store.data_status(&widget.id),
                    selected: selected.as_ref() == Some(&widget.id),
                    previewing: preview.is_some(),
                    rect: self.metrics.to_pixels(layout),
                    layout,
                    title: widget.title,
                    kind: widget.kind,
                    id: widget.id,
                }
            })
            .collect()
    }

    /// Pixel height needed to show every widget, preview included.
    pub fn content_height(&self, store: &DashboardStore) -> f64 {
        self.frames(store)
            .iter()
            .map(|f| f.rect.top + f.rect.height)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::DashboardDefinition;

    fn canvas() -> CanvasView {
        // 100px columns and 60px rows on a 12-column grid
        let settings = GridSettings {
            gap_px: 10.0,
            row_height_px: 50.0,
            container_width_px: 1190.0,
        };
        CanvasView::new(settings, 12)
    }

    #[test]
    fn test_drag_previews_without_touching_store() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::StatCard);
        let mut canvas = canvas();

        canvas
            .pointer_down(&mut store, 1, &id, DragMode::Move, PointerPosition::new(0.0, 0.0))
            .unwrap();
        canvas.pointer_move(1, PointerPosition::new(310.0, 130.0));

        assert_eq!(store.widget(&id).unwrap().layout, GridLayout::new(0, 0, 3, 2));
        let frame = &canvas.frames(&store)[0];
        assert!(frame.previewing);
        assert!(frame.selected);
        assert_eq!(frame.layout, GridLayout::new(3, 2, 3, 2));
        assert_eq!(frame.rect.left, 300.0);

        assert_eq!(canvas.pointer_up(&mut store, 1).unwrap(), Some(GridLayout::new(3, 2, 3, 2)));
        assert_eq!(store.widget(&id).unwrap().layout, GridLayout::new(3, 2, 3, 2));
        assert!(!canvas.frames(&store)[0].previewing);
    }

    #[test]
    fn test_cancel_restores_committed_layout() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        let mut canvas = canvas();

        canvas
            .pointer_down(&mut store, 4, &id, DragMode::Resize, PointerPosition::new(0.0, 0.0))
            .unwrap();
        canvas.pointer_move(4, PointerPosition::new(-300.0, 0.0));
        canvas.pointer_cancel(4);

        assert_eq!(canvas.pointer_up(&mut store, 4).unwrap(), None);
        assert_eq!(canvas.frames(&store)[0].layout, GridLayout::new(0, 0, 6, 4));
    }

    #[test]
    fn test_second_pointer_rejected_while_dragging() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let a = store.add_widget(WidgetType::Table);
        let b = store.add_widget(WidgetType::Table);
        let mut canvas = canvas();

        canvas
            .pointer_down(&mut store, 1, &a, DragMode::Move, PointerPosition::new(0.0, 0.0))
            .unwrap();
        let err = canvas
            .pointer_down(&mut store, 2, &b, DragMode::Move, PointerPosition::new(0.0, 0.0))
            .unwrap_err();
        assert_eq!(err, DashboardError::GestureActive(a.clone()));
        assert_eq!(store.selected_widget(), Some(a));
    }

    #[test]
    fn test_removed_widget_mid_drag() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        let mut canvas = canvas();
        canvas
            .pointer_down(&mut store, 1, &id, DragMode::Move, PointerPosition::new(0.0, 0.0))
            .unwrap();

        store.remove_widget(&id).unwrap();
        canvas.forget_widget(&id);
        assert!(!canvas.is_dragging());
        assert_eq!(canvas.pointer_up(&mut store, 1).unwrap(), None);
    }

    #[test]
    fn test_resize_changes_pitch() {
        let mut canvas = canvas();
        canvas.resize(590.0, 6);
        assert!((canvas.metrics().col_step_px - 100.0).abs() < 1e-9);

        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        store.add_widget(WidgetType::Table);
        canvas.resize(1190.0, 12);
        assert!((canvas.content_height(&store) - 230.0).abs() < 1e-9);
    }
}

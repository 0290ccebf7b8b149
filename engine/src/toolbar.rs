//! Floating toolbar geometry and layout.

use comfort_types::{Point, Size, ToolDescriptor, Viewport};

/// Vertical distance from the pointer to the toolbar's top edge.
pub const POINTER_OFFSET_Y: f64 = 95.0;
/// Minimum gap between the toolbar and every viewport edge.
pub const VIEWPORT_INSET: f64 = 10.0;

/// Top-left corner for the toolbar: horizontally centered on the pointer and
/// raised above it, then clamped inside the viewport.
///
/// The low bound is applied last, so a viewport narrower (or shorter) than the
/// toolbar plus both insets pins the toolbar to the left (or top) inset.
#[must_use]
pub fn compute_toolbar_position(pointer: Point, toolbar: Size, viewport: Viewport) -> Point {
    let x = pointer.x - toolbar.width / 2.0;
    let y = pointer.y - POINTER_OFFSET_Y;

    let max_x = viewport.width - toolbar.width - VIEWPORT_INSET;
    let max_y = viewport.height - toolbar.height - VIEWPORT_INSET;

    Point::new(
        x.min(max_x).max(VIEWPORT_INSET),
        y.min(max_y).max(VIEWPORT_INSET),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarItem<'a> {
    Tool(&'a ToolDescriptor),
    Divider,
    Settings,
    Close,
}

/// Active tools in order, a divider wherever the group changes, then the
/// settings and close controls.
#[must_use]
pub fn toolbar_items(tools: &[ToolDescriptor]) -> Vec<ToolbarItem<'_>> {
    let mut items = Vec::with_capacity(tools.len() * 2 + 2);
    let mut last_group = None;
    for tool in tools.iter().filter(|tool| tool.active) {
        if last_group.is_some_and(|group| group != tool.group) {
            items.push(ToolbarItem::Divider);
        }
        last_group = Some(tool.group);
        items.push(ToolbarItem::Tool(tool));
    }
    items.push(ToolbarItem::Settings);
    items.push(ToolbarItem::Close);
    items
}

use crate::commands::Rect;
use crate::context::SceneSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Horizontal scroll plus the uniform scale that fits the scene height to
/// the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneView {
    pub scroll_x: f32,
    pub scale: f32,
}

impl SceneView {
    pub fn fit(viewport: Viewport, scene: SceneSize, scroll_x: f32) -> Self {
        let scale = if scene.height > 0.0 {
            viewport.height as f32 / scene.height
        } else {
            1.0
        };
        Self { scroll_x, scale }
    }
}

pub fn world_to_screen_px(x: f32, y: f32, view: SceneView) -> (i32, i32) {
    let sx = (x - view.scroll_x) * view.scale;
    let sy = y * view.scale;
    (sx.round() as i32, sy.round() as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScreenRectPx {
    pub(crate) left: i32,
    pub(crate) top: i32,
    pub(crate) right: i32,
    pub(crate) bottom: i32,
}

pub(crate) fn rect_to_screen(rect: Rect, view: SceneView) -> ScreenRectPx {
    let (left, top) = world_to_screen_px(rect.x, rect.y, view);
    let (right, bottom) = world_to_screen_px(rect.right(), rect.bottom(), view);
    ScreenRectPx {
        left,
        top,
        right,
        bottom,
    }
}

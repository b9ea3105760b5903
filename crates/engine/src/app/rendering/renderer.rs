use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::ArcadeWorld;
use crate::content::SpawnKind;
use crate::game::EngineBackend;
use crate::player::BodyProfile;

use super::transform::{rect_to_screen, ScreenRectPx};
use super::{world_to_screen_px, SceneView, Viewport};

const SKY_COLOR: [u8; 4] = [22, 27, 44, 255];
const FOREGROUND_COLOR: [u8; 4] = [46, 52, 64, 255];
const GROUND_COLOR: [u8; 4] = [96, 104, 120, 255];
const CONVEYOR_COLOR: [u8; 4] = [150, 120, 60, 255];
const SLIDE_COLOR: [u8; 4] = [90, 160, 200, 255];
const PUSH_COLOR: [u8; 4] = [170, 110, 80, 255];
const BOARD_COLOR: [u8; 4] = [240, 200, 60, 255];
const HAZARD_COLOR: [u8; 4] = [220, 70, 70, 255];
const PICKUP_COLOR: [u8; 4] = [90, 220, 120, 255];
const DASHBOARD_COLOR: [u8; 4] = [120, 90, 200, 255];
const DECORATION_COLOR: [u8; 4] = [60, 66, 84, 255];
const PLAYER_COLOR: [u8; 4] = [235, 235, 245, 255];
const PLAYER_SURF_COLOR: [u8; 4] = [120, 230, 255, 255];
const PLAYER_GUN_COLOR: [u8; 4] = [255, 170, 90, 255];
const TITLE_BAND_COLOR: [u8; 4] = [10, 10, 14, 255];
const TITLE_ACCENT_COLOR: [u8; 4] = [230, 60, 60, 255];
const MUTE_MARKER_COLOR: [u8; 4] = [200, 200, 210, 255];
const MUTE_MARKER_HALF_SIZE_PX: i32 = 6;
const TITLE_BAND_HEIGHT_PX: i32 = 48;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &ArcadeWorld) -> Result<(), Error> {
        let viewport = self.viewport;
        let view = SceneView::fit(viewport, world.config().screen, world.camera_scroll_x());
        let frame = self.pixels.frame_mut();
        draw_world(frame, viewport, view, world);
        self.pixels.render()
    }
}

fn draw_world(frame: &mut [u8], viewport: Viewport, view: SceneView, world: &ArcadeWorld) {
    fill(frame, SKY_COLOR);

    let (_, foreground_top) = world_to_screen_px(0.0, world.config().foreground_y, view);
    fill_rect_clipped(
        frame,
        viewport,
        ScreenRectPx {
            left: 0,
            top: foreground_top,
            right: viewport.width as i32,
            bottom: viewport.height as i32,
        },
        FOREGROUND_COLOR,
    );

    for object in world.objects().filter(|object| object.visible) {
        let rect = rect_to_screen(object.rect, view);
        fill_rect_clipped(frame, viewport, rect, color_for_kind(&object.kind));
    }

    let player = rect_to_screen(world.body_rect(), view);
    fill_rect_clipped(frame, viewport, player, color_for_profile(world.body().profile));

    if world.title().is_some() {
        let middle = viewport.height as i32 / 2;
        let band = ScreenRectPx {
            left: 0,
            top: middle - TITLE_BAND_HEIGHT_PX / 2,
            right: viewport.width as i32,
            bottom: middle + TITLE_BAND_HEIGHT_PX / 2,
        };
        fill_rect_clipped(frame, viewport, band, TITLE_BAND_COLOR);
        let accent = ScreenRectPx {
            top: band.bottom - 4,
            ..band
        };
        fill_rect_clipped(frame, viewport, accent, TITLE_ACCENT_COLOR);
    }

    if world.sound().muted {
        let cx = viewport.width as i32 - MUTE_MARKER_HALF_SIZE_PX * 3;
        let cy = MUTE_MARKER_HALF_SIZE_PX * 3;
        draw_square(
            frame,
            viewport,
            cx,
            cy,
            MUTE_MARKER_HALF_SIZE_PX,
            MUTE_MARKER_COLOR,
        );
    }
}

fn color_for_kind(kind: &SpawnKind) -> [u8; 4] {
    match kind {
        SpawnKind::Ground => GROUND_COLOR,
        SpawnKind::Conveyor { .. } => CONVEYOR_COLOR,
        SpawnKind::Slide => SLIDE_COLOR,
        SpawnKind::PushBlock => PUSH_COLOR,
        SpawnKind::Board => BOARD_COLOR,
        SpawnKind::Hazard => HAZARD_COLOR,
        SpawnKind::Pickup { .. } => PICKUP_COLOR,
        SpawnKind::Dashboard => DASHBOARD_COLOR,
        SpawnKind::Image | SpawnKind::Background | SpawnKind::Logo => DECORATION_COLOR,
    }
}

fn color_for_profile(profile: BodyProfile) -> [u8; 4] {
    match profile {
        BodyProfile::Standard => PLAYER_COLOR,
        BodyProfile::Surf => PLAYER_SURF_COLOR,
        BodyProfile::Gun => PLAYER_GUN_COLOR,
    }
}

fn fill(frame: &mut [u8], color: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

fn fill_rect_clipped(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right.min(viewport.width as i32);
    let bottom = rect.bottom.min(viewport.height as i32);
    for y in top..bottom {
        for x in left..right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn draw_square(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    fill_rect_clipped(
        frame,
        viewport,
        ScreenRectPx {
            left: cx - half_size,
            top: cy - half_size,
            right: cx + half_size + 1,
            bottom: cy + half_size + 1,
        },
        color,
    );
}

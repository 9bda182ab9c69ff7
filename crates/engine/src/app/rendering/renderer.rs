use std::f32::consts::TAU;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{
    AnimationKind, Hud, HudPanel, HudPanelAnchor, HudTone, LoopPolicy, SceneController,
    SceneObject, SceneObjectKind, Vec3,
};

use super::font::{text_width_px, Canvas, LINE_ADVANCE};
use super::transform::{Projection, Viewport};

const CLEAR_COLOR: [u8; 4] = [17, 24, 39, 255];
const GROUND_COLOR: [u8; 4] = [31, 41, 55, 255];
const GROUND_AXIS_COLOR: [u8; 4] = [55, 65, 81, 255];
const LOCATION_COLOR: [u8; 4] = [45, 212, 191, 255];
const LOCATION_LABEL_COLOR: [u8; 4] = [153, 246, 228, 200];
const TARGET_COLOR: [u8; 4] = [248, 113, 113, 255];
const LIGHT_ON_COLOR: [u8; 4] = [253, 224, 71, 255];
const LIGHT_GLOW_COLOR: [u8; 4] = [253, 224, 71, 40];
const LIGHT_OFF_COLOR: [u8; 4] = [107, 114, 128, 255];
const DOOR_COLOR: [u8; 4] = [180, 140, 100, 255];
const AVATAR_IDLE_COLOR: [u8; 4] = [229, 231, 235, 255];
const AVATAR_MOVE_COLOR: [u8; 4] = [45, 212, 191, 255];
const AVATAR_TALK_COLOR: [u8; 4] = [251, 191, 36, 255];
const AVATAR_GESTURE_COLOR: [u8; 4] = [232, 121, 249, 255];
const AVATAR_REST_COLOR: [u8; 4] = [129, 140, 248, 255];
const PANEL_BG_COLOR: [u8; 4] = [10, 12, 16, 215];
const PANEL_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];
const GROUND_HALF_EXTENT: i32 = 10;
const LOCATION_MARKER_SIZE: f32 = 0.3;
const LIGHT_RADIUS_WORLD: f32 = 0.2;
const DOOR_WIDTH: f32 = 1.2;
const DOOR_HEIGHT: f32 = 2.0;
const FACING_LENGTH: f32 = 0.6;
const BOB_AMPLITUDE: f32 = 0.04;
const PANEL_MARGIN: i32 = 12;
const PANEL_PADDING: i32 = 8;
const PANEL_GAP: i32 = 8;

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

    pub(crate) fn render(&mut self, scene: &SceneController, hud: &Hud) -> Result<(), Error> {
        let viewport = self.viewport;
        let mut canvas = Canvas {
            frame: self.pixels.frame_mut(),
            width: viewport.width,
            height: viewport.height,
        };
        draw_stage(&mut canvas, scene, viewport);
        draw_hud(&mut canvas, hud);
        self.pixels.render()
    }
}

fn draw_stage(canvas: &mut Canvas<'_>, scene: &SceneController, viewport: Viewport) {
    canvas.clear(clear_color(scene.objects()));
    if viewport.width == 0 || viewport.height == 0 {
        return;
    }
    let projection = Projection::from_camera(scene.camera(), viewport);

    draw_ground(canvas, &projection);
    for (name, position) in scene.locations() {
        draw_location(canvas, &projection, name, *position);
    }
    for object in scene.objects() {
        draw_object(canvas, &projection, object);
    }
    if let Some(target) = scene.target() {
        if let Some((from, to)) = projection.project_segment(scene.avatar().position, target) {
            canvas.line(from, to, TARGET_COLOR);
        }
        draw_cross(canvas, &projection, target, LOCATION_MARKER_SIZE * 0.5, TARGET_COLOR);
    }
    draw_avatar(canvas, &projection, scene);
}

fn clear_color(objects: &[SceneObject]) -> [u8; 4] {
    let lit = objects
        .iter()
        .filter_map(|object| match object.kind {
            SceneObjectKind::Light { intensity, .. } => Some(intensity),
            SceneObjectKind::Door { .. } => None,
        })
        .sum::<f32>();
    let boost = (lit * 3.0).clamp(0.0, 30.0) as u8;
    [
        CLEAR_COLOR[0].saturating_add(boost),
        CLEAR_COLOR[1].saturating_add(boost),
        CLEAR_COLOR[2].saturating_add(boost / 2),
        255,
    ]
}

fn draw_segment(canvas: &mut Canvas<'_>, projection: &Projection, a: Vec3, b: Vec3, color: [u8; 4]) {
    if let Some((from, to)) = projection.project_segment(a, b) {
        canvas.line(from, to, color);
    }
}

fn draw_ground(canvas: &mut Canvas<'_>, projection: &Projection) {
    let extent = GROUND_HALF_EXTENT as f32;
    for i in -GROUND_HALF_EXTENT..=GROUND_HALF_EXTENT {
        let offset = i as f32;
        let color = if i == 0 {
            GROUND_AXIS_COLOR
        } else {
            GROUND_COLOR
        };
        draw_segment(
            canvas,
            projection,
            Vec3::new(offset, 0.0, -extent),
            Vec3::new(offset, 0.0, extent),
            color,
        );
        draw_segment(
            canvas,
            projection,
            Vec3::new(-extent, 0.0, offset),
            Vec3::new(extent, 0.0, offset),
            color,
        );
    }
}

fn draw_cross(
    canvas: &mut Canvas<'_>,
    projection: &Projection,
    at: Vec3,
    half: f32,
    color: [u8; 4],
) {
    draw_segment(
        canvas,
        projection,
        at + Vec3::new(-half, 0.0, -half),
        at + Vec3::new(half, 0.0, half),
        color,
    );
    draw_segment(
        canvas,
        projection,
        at + Vec3::new(-half, 0.0, half),
        at + Vec3::new(half, 0.0, -half),
        color,
    );
}

fn draw_location(canvas: &mut Canvas<'_>, projection: &Projection, name: &str, position: Vec3) {
    draw_cross(canvas, projection, position, LOCATION_MARKER_SIZE, LOCATION_COLOR);
    if let Some((x, y)) = projection.project(position) {
        canvas.text(x + 6, y + 4, name, LOCATION_LABEL_COLOR);
    }
}

fn draw_object(canvas: &mut Canvas<'_>, projection: &Projection, object: &SceneObject) {
    match object.kind {
        SceneObjectKind::Light { intensity, .. } => {
            let Some(center) = projection.project(object.position) else {
                return;
            };
            let radius = projection
                .scale_at(object.position)
                .map(|scale| (scale * LIGHT_RADIUS_WORLD).round() as i32)
                .unwrap_or(2)
                .max(2);
            if intensity > 0.0 {
                canvas.disc(center, radius * 4, LIGHT_GLOW_COLOR);
                canvas.disc(center, radius, LIGHT_ON_COLOR);
            } else {
                canvas.disc(center, radius, LIGHT_OFF_COLOR);
            }
        }
        SceneObjectKind::Door { open } => {
            let half = DOOR_WIDTH * 0.5;
            // Closed doors span x; open doors swing to span z from the hinge.
            let (a, b) = if open {
                (
                    object.position + Vec3::new(-half, 0.0, 0.0),
                    object.position + Vec3::new(-half, 0.0, -DOOR_WIDTH),
                )
            } else {
                (
                    object.position + Vec3::new(-half, 0.0, 0.0),
                    object.position + Vec3::new(half, 0.0, 0.0),
                )
            };
            let lift = Vec3::new(0.0, DOOR_HEIGHT, 0.0);
            draw_segment(canvas, projection, a, b, DOOR_COLOR);
            draw_segment(canvas, projection, a + lift, b + lift, DOOR_COLOR);
            draw_segment(canvas, projection, a, a + lift, DOOR_COLOR);
            draw_segment(canvas, projection, b, b + lift, DOOR_COLOR);
        }
    }
}

fn avatar_color(kind: Option<AnimationKind>, loop_policy: Option<LoopPolicy>) -> [u8; 4] {
    match (kind, loop_policy) {
        (None, _) => AVATAR_IDLE_COLOR,
        (Some(kind), _) if kind.is_movement() => AVATAR_MOVE_COLOR,
        (Some(AnimationKind::TalkPassionately), _) => AVATAR_TALK_COLOR,
        (Some(_), Some(LoopPolicy::OnceClamp)) => AVATAR_GESTURE_COLOR,
        (Some(_), _) => AVATAR_REST_COLOR,
    }
}

/// Vertical offset that makes the active clip visible on the box avatar.
fn avatar_bob(scene: &SceneController) -> f32 {
    let mixer = scene.mixer();
    mixer
        .contributing()
        .map(|(handle, weight)| (mixer.time(handle) * TAU).sin().abs() * weight * BOB_AMPLITUDE)
        .fold(0.0, f32::max)
}

fn draw_avatar(canvas: &mut Canvas<'_>, projection: &Projection, scene: &SceneController) {
    let avatar = scene.avatar();
    let active = scene.active();
    let color = avatar_color(
        active.map(|active| active.kind),
        active.map(|active| active.loop_policy),
    );
    let base = avatar.position + Vec3::new(0.0, avatar_bob(scene), 0.0);
    let (sin, cos) = avatar.yaw.sin_cos();
    let forward = Vec3::new(sin, 0.0, cos);
    let right = Vec3::new(cos, 0.0, -sin);
    let half_w = avatar.size.x * 0.5;
    let half_d = avatar.size.z * 0.5;
    let lift = Vec3::new(0.0, avatar.size.y, 0.0);

    let corners = [
        base + right * half_w + forward * half_d,
        base + right * half_w + forward * -half_d,
        base + right * -half_w + forward * -half_d,
        base + right * -half_w + forward * half_d,
    ];
    for index in 0..corners.len() {
        let a = corners[index];
        let b = corners[(index + 1) % corners.len()];
        draw_segment(canvas, projection, a, b, color);
        draw_segment(canvas, projection, a + lift, b + lift, color);
        draw_segment(canvas, projection, a, a + lift, color);
    }

    let chest = base + Vec3::new(0.0, avatar.size.y * 0.75, 0.0);
    draw_segment(
        canvas,
        projection,
        chest,
        chest + forward * FACING_LENGTH,
        color,
    );
}

fn tone_color(tone: HudTone) -> [u8; 4] {
    match tone {
        HudTone::Normal => [244, 248, 252, 255],
        HudTone::Dim => [156, 163, 175, 255],
        HudTone::Accent => [45, 212, 191, 255],
        HudTone::User => [209, 213, 219, 255],
        HudTone::Bot => [94, 234, 212, 255],
        HudTone::System => [176, 198, 220, 255],
        HudTone::Error => [248, 113, 113, 255],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PanelRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

fn panel_size(line_widths: impl Iterator<Item = i32>, line_count: usize) -> (i32, i32) {
    let width = line_widths.max().unwrap_or(0) + PANEL_PADDING * 2;
    let height = line_count as i32 * LINE_ADVANCE + PANEL_PADDING * 2;
    (width, height)
}

/// Stacks panels away from their anchor edge, in the order given.
fn layout_panels(sizes: &[(HudPanelAnchor, (i32, i32))], width: u32, height: u32) -> Vec<PanelRect> {
    let (width, height) = (width as i32, height as i32);
    let mut top_left = PANEL_MARGIN;
    let mut top_right = PANEL_MARGIN;
    let mut bottom_left = height - PANEL_MARGIN;
    let mut bottom_right = height - PANEL_MARGIN;
    let mut center = None::<i32>;

    sizes
        .iter()
        .map(|(anchor, (w, h))| {
            let (w, h) = (*w, *h);
            match anchor {
                HudPanelAnchor::TopLeft => {
                    let rect = PanelRect {
                        x: PANEL_MARGIN,
                        y: top_left,
                        width: w,
                        height: h,
                    };
                    top_left += h + PANEL_GAP;
                    rect
                }
                HudPanelAnchor::TopRight => {
                    let rect = PanelRect {
                        x: width - PANEL_MARGIN - w,
                        y: top_right,
                        width: w,
                        height: h,
                    };
                    top_right += h + PANEL_GAP;
                    rect
                }
                HudPanelAnchor::BottomLeft => {
                    bottom_left -= h;
                    let rect = PanelRect {
                        x: PANEL_MARGIN,
                        y: bottom_left,
                        width: w,
                        height: h,
                    };
                    bottom_left -= PANEL_GAP;
                    rect
                }
                HudPanelAnchor::BottomRight => {
                    bottom_right -= h;
                    let rect = PanelRect {
                        x: width - PANEL_MARGIN - w,
                        y: bottom_right,
                        width: w,
                        height: h,
                    };
                    bottom_right -= PANEL_GAP;
                    rect
                }
                HudPanelAnchor::Center => {
                    let y = center.unwrap_or((height - h) / 2);
                    center = Some(y + h + PANEL_GAP);
                    PanelRect {
                        x: (width - w) / 2,
                        y,
                        width: w,
                        height: h,
                    }
                }
            }
        })
        .collect()
}

fn draw_hud(canvas: &mut Canvas<'_>, hud: &Hud) {
    if canvas.width == 0 || canvas.height == 0 {
        return;
    }
    let laid_out: Vec<_> = hud.panels.iter().map(HudPanel::layout_lines).collect();
    let sizes: Vec<_> = hud
        .panels
        .iter()
        .zip(&laid_out)
        .map(|(panel, lines)| {
            (
                panel.anchor,
                panel_size(lines.iter().map(|line| text_width_px(&line.text)), lines.len()),
            )
        })
        .collect();
    let rects = layout_panels(&sizes, canvas.width, canvas.height);

    for (rect, lines) in rects.iter().zip(&laid_out) {
        if lines.is_empty() {
            continue;
        }
        canvas.fill_rect(rect.x, rect.y, rect.width, rect.height, PANEL_BG_COLOR);
        canvas.outline_rect(rect.x, rect.y, rect.width, rect.height, PANEL_BORDER_COLOR);
        let mut y = rect.y + PANEL_PADDING;
        for line in lines {
            canvas.text(rect.x + PANEL_PADDING, y, &line.text, tone_color(line.tone));
            y += LINE_ADVANCE;
        }
    }
}

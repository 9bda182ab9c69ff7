use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::{ObjectDefKind, StageManifest};

use super::animation::{ActiveAnimation, AnimationKind, AnimationMixer, ClipRegistry};
use super::hud::Hud;
use super::input::InputSnapshot;
use super::math::Vec3;

pub const CROSS_FADE_SECONDS: f32 = 0.3;
pub const STOP_FADE_SECONDS: f32 = 0.5;
pub const MOVEMENT_SPEED: f32 = 1.5;
pub const ARRIVAL_THRESHOLD: f32 = 0.1;
const CAMERA_FOV_DEGREES: f32 = 50.0;
const CAMERA_MIN_DISTANCE: f32 = 3.0;
const CAMERA_MAX_DISTANCE: f32 = 40.0;
const CAMERA_ZOOM_STEP: f32 = 0.5;
const CAMERA_PITCH_LIMIT: f32 = 1.45;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("animation '{name}' not found")]
    UnknownAnimation { name: String },
    #[error("unknown location '{name}'")]
    UnknownLocation { name: String },
    #[error("unknown object '{name}'")]
    UnknownObject { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started(AnimationKind),
    AlreadyPlaying(AnimationKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub destination: Vec3,
    pub animation: Result<PlayOutcome, SceneError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractOutcome {
    pub object_key: String,
    /// User-facing description of the toggle, e.g. `Toggled the store lights on.`
    pub notice: String,
    pub animation: Result<PlayOutcome, SceneError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneObjectKind {
    Light { intensity: f32, on_intensity: f32 },
    Door { open: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub key: String,
    pub kind: SceneObjectKind,
    pub position: Vec3,
}

impl SceneObject {
    /// Flips the binary state and returns the word describing the new state.
    fn toggle(&mut self) -> &'static str {
        match &mut self.kind {
            SceneObjectKind::Light {
                intensity,
                on_intensity,
            } => {
                *intensity = if *intensity > 0.0 { 0.0 } else { *on_intensity };
                if *intensity > 0.0 {
                    "on"
                } else {
                    "off"
                }
            }
            SceneObjectKind::Door { open } => {
                *open = !*open;
                if *open {
                    "open"
                } else {
                    "closed"
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Avatar {
    pub position: Vec3,
    /// Rotation about the vertical axis; zero faces +z.
    pub yaw: f32,
    pub size: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_degrees: f32,
}

impl OrbitCamera {
    /// Frames a model of the given extents standing on the ground at the origin.
    pub fn framing(model_size: Vec3) -> Self {
        let center = Vec3::new(0.0, model_size.y * 0.5, 0.0);
        let max_dim = model_size.x.max(model_size.y).max(model_size.z);
        let half_fov = (CAMERA_FOV_DEGREES.to_radians()) * 0.5;
        let camera_z = (max_dim / 1.5 / half_fov.tan()).abs().max(CAMERA_MIN_DISTANCE);
        let offset = Vec3::new(0.0, 1.0, camera_z);
        let distance = offset.length();
        Self {
            target: center,
            yaw: 0.0,
            pitch: (offset.y / distance).asin(),
            distance,
            fov_degrees: CAMERA_FOV_DEGREES,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.sin(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.cos(),
            )
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if !(delta_yaw.is_finite() && delta_pitch.is_finite()) {
            return;
        }
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-CAMERA_PITCH_LIMIT, CAMERA_PITCH_LIMIT);
    }

    pub fn zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let next = self.distance - steps as f32 * CAMERA_ZOOM_STEP;
        self.distance = next.clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    }
}

/// Owns the stage: avatar, clips, world locations and interactable objects.
///
/// Every operation is expected to run on the render loop thread; nothing here is shared.
#[derive(Debug, Clone)]
pub struct SceneController {
    model_asset: String,
    registry: ClipRegistry,
    mixer: AnimationMixer,
    active: Option<ActiveAnimation>,
    avatar: Avatar,
    target: Option<Vec3>,
    locations: Vec<(String, Vec3)>,
    interactables: Vec<(String, String)>,
    objects: Vec<SceneObject>,
    camera: OrbitCamera,
}

impl SceneController {
    pub fn from_manifest(manifest: &StageManifest) -> Self {
        let mut registry = ClipRegistry::default();
        let mut mixer = AnimationMixer::default();
        for clip in &manifest.clips {
            registry.register(
                &mut mixer,
                clip.kind,
                clip.file.clone(),
                clip.duration_seconds,
                clip.loop_policy,
            );
        }
        for kind in AnimationKind::ALL {
            if !registry.contains(kind) {
                warn!(animation = kind.name(), "clip_missing");
            }
        }

        let objects = manifest
            .objects
            .iter()
            .map(|object| SceneObject {
                key: object.key.clone(),
                kind: match object.kind {
                    ObjectDefKind::Light {
                        intensity,
                        on_intensity,
                    } => SceneObjectKind::Light {
                        intensity,
                        on_intensity,
                    },
                    ObjectDefKind::Door { open } => SceneObjectKind::Door { open },
                },
                position: object.position,
            })
            .collect();

        let scene = Self {
            model_asset: manifest.model.asset.clone(),
            registry,
            mixer,
            active: None,
            avatar: Avatar {
                position: Vec3::ZERO,
                yaw: 0.0,
                size: manifest.model.size,
            },
            target: None,
            locations: manifest
                .locations
                .iter()
                .map(|location| (location.name.clone(), location.position))
                .collect(),
            interactables: manifest
                .interactables
                .iter()
                .map(|interactable| (interactable.name.clone(), interactable.object_key.clone()))
                .collect(),
            objects,
            camera: OrbitCamera::framing(manifest.model.size),
        };
        info!(
            model = %scene.model_asset,
            clip_count = scene.registry.len(),
            location_count = scene.locations.len(),
            object_count = scene.objects.len(),
            "scene_loaded"
        );
        scene
    }

    pub fn play_animation(&mut self, name: &str) -> Result<PlayOutcome, SceneError> {
        match AnimationKind::from_name(name) {
            Some(kind) => self.play_kind(kind),
            None => {
                warn!(animation = name, "animation_not_found");
                Err(SceneError::UnknownAnimation {
                    name: name.to_string(),
                })
            }
        }
    }

    pub fn play_kind(&mut self, kind: AnimationKind) -> Result<PlayOutcome, SceneError> {
        let Some(entry) = self.registry.get(kind) else {
            warn!(animation = kind.name(), "animation_not_found");
            return Err(SceneError::UnknownAnimation {
                name: kind.name().to_string(),
            });
        };
        let handle = entry.handle;
        let loop_policy = entry.loop_policy;

        if let Some(active) = self.active {
            if active.handle == handle && self.mixer.is_running(handle) {
                debug!(animation = kind.name(), "animation_already_playing");
                return Ok(PlayOutcome::AlreadyPlaying(kind));
            }
            if active.handle != handle {
                self.mixer.fade_out(active.handle, CROSS_FADE_SECONDS);
            }
        }

        self.mixer.reset(handle);
        self.mixer.set_loop_policy(handle, loop_policy);
        self.mixer.fade_in(handle, CROSS_FADE_SECONDS);
        self.active = Some(ActiveAnimation {
            kind,
            handle,
            loop_policy,
        });
        debug!(animation = kind.name(), ?loop_policy, "animation_started");
        Ok(PlayOutcome::Started(kind))
    }

    /// Returns the avatar to the idle pose.
    pub fn stop_animation(&mut self) {
        self.fade_out_active(STOP_FADE_SECONDS);
    }

    pub fn fade_out_active(&mut self, seconds: f32) {
        if let Some(active) = self.active.take() {
            self.mixer.fade_out(active.handle, seconds);
            debug!(animation = active.kind.name(), seconds, "animation_faded_out");
        }
    }

    pub fn move_to(
        &mut self,
        location: &str,
        animation: Option<&str>,
    ) -> Result<MoveOutcome, SceneError> {
        let Some(destination) = self.location(location) else {
            warn!(location, "location_not_found");
            return Err(SceneError::UnknownLocation {
                name: location.to_string(),
            });
        };
        self.target = Some(destination);
        info!(
            location,
            x = destination.x,
            y = destination.y,
            z = destination.z,
            "avatar_move_started"
        );
        let animation = match animation {
            Some(name) => self.play_animation(name),
            None => self.play_kind(AnimationKind::DEFAULT_MOVE),
        };
        Ok(MoveOutcome {
            destination,
            animation,
        })
    }

    pub fn interact(
        &mut self,
        name: &str,
        animation: Option<&str>,
    ) -> Result<InteractOutcome, SceneError> {
        let object_index = self
            .interactables
            .iter()
            .find(|(interactable, _)| interactable == name)
            .and_then(|(_, key)| self.objects.iter().position(|object| &object.key == key));
        let Some(object_index) = object_index else {
            warn!(object = name, "interactable_not_found");
            return Err(SceneError::UnknownObject {
                name: name.to_string(),
            });
        };

        let animation = match animation {
            Some(animation) => self.play_animation(animation),
            None => self.play_kind(AnimationKind::DEFAULT_INTERACT),
        };
        let object = &mut self.objects[object_index];
        let state = object.toggle();
        info!(object = name, key = %object.key, state, "object_toggled");
        Ok(InteractOutcome {
            object_key: object.key.clone(),
            notice: format!("Toggled the {name} {state}."),
            animation,
        })
    }

    /// Advances clip playback and avatar movement by one step.
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.mixer.update(dt);

        let Some(target) = self.target else {
            return;
        };
        let to_target = target - self.avatar.position;
        let distance = to_target.length();
        if distance > ARRIVAL_THRESHOLD {
            let direction = to_target.normalize();
            let step = (MOVEMENT_SPEED * dt).min(distance);
            self.avatar.position += direction * step;
            if direction.x != 0.0 || direction.z != 0.0 {
                self.avatar.yaw = direction.x.atan2(direction.z);
            }
        } else {
            self.target = None;
            info!(
                x = self.avatar.position.x,
                z = self.avatar.position.z,
                "avatar_arrived"
            );
            if self.active.is_some_and(|active| active.kind.is_movement()) {
                self.fade_out_active(CROSS_FADE_SECONDS);
            }
        }
    }

    pub fn location(&self, name: &str) -> Option<Vec3> {
        self.locations
            .iter()
            .find(|(location, _)| location == name)
            .map(|(_, position)| *position)
    }

    pub fn locations(&self) -> &[(String, Vec3)] {
        &self.locations
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, key: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.key == key)
    }

    pub fn active(&self) -> Option<ActiveAnimation> {
        self.active
    }

    pub fn active_kind(&self) -> Option<AnimationKind> {
        self.active.map(|active| active.kind)
    }

    pub fn available_animations(&self) -> impl Iterator<Item = AnimationKind> + '_ {
        self.registry.kinds()
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn avatar(&self) -> Avatar {
        self.avatar
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn model_asset(&self) -> &str {
        &self.model_asset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    None,
    Quit,
}

/// The application driven by the windowed loop. The loop advances the scene after each
/// `update` and draws the returned HUD on top of the stage.
pub trait Frontend {
    fn load(&mut self, scene: &mut SceneController);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        scene: &mut SceneController,
    ) -> LoopCommand;
    fn hud(&self, scene: &SceneController) -> Hud;
    fn unload(&mut self, scene: &mut SceneController);
    fn debug_title(&self) -> Option<String> {
        None
    }
    /// Extra lines appended to the debug overlay.
    fn overlay_lines(&self) -> Vec<String> {
        Vec::new()
    }
}

use crate::app::{AnimationKind, LoopPolicy, Vec3};

pub const STAGE_MANIFEST_FILE: &str = "stage.xml";

#[derive(Debug, Clone, PartialEq)]
pub struct StageManifest {
    pub model: ModelDef,
    pub clips: Vec<ClipDef>,
    pub locations: Vec<LocationDef>,
    pub objects: Vec<ObjectDef>,
    pub interactables: Vec<InteractableDef>,
}

impl StageManifest {
    pub fn location(&self, name: &str) -> Option<&LocationDef> {
        self.locations.iter().find(|location| location.name == name)
    }

    pub fn object(&self, key: &str) -> Option<&ObjectDef> {
        self.objects.iter().find(|object| object.key == key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub asset: String,
    /// Bounding box extents of the avatar model in world units.
    pub size: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipDef {
    pub kind: AnimationKind,
    pub file: String,
    pub duration_seconds: f32,
    pub loop_policy: LoopPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationDef {
    pub name: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectDefKind {
    Light { intensity: f32, on_intensity: f32 },
    Door { open: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    pub key: String,
    pub kind: ObjectDefKind,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractableDef {
    pub name: String,
    pub object_key: String,
}

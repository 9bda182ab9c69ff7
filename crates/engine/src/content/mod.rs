mod compiler;
mod types;

pub use compiler::{
    compile_stage_manifest, load_stage_manifest, ContentCompileError, ContentErrorCode,
    SourceLocation,
};
pub use types::{
    ClipDef, InteractableDef, LocationDef, ModelDef, ObjectDef, ObjectDefKind, StageManifest,
    STAGE_MANIFEST_FILE,
};

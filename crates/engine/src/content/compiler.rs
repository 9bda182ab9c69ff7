use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::app::{AnimationKind, LoopPolicy, Vec3};

use super::types::{
    ClipDef, InteractableDef, LocationDef, ModelDef, ObjectDef, ObjectDefKind, StageManifest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownAttribute,
    MissingAttribute,
    MissingSection,
    DuplicateSection,
    InvalidValue,
    DuplicateName,
    UnknownReference,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

pub fn load_stage_manifest(path: &Path) -> Result<StageManifest, ContentCompileError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read stage manifest: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    compile_stage_manifest(path, &raw)
}

pub fn compile_stage_manifest(
    file_path: &Path,
    raw: &str,
) -> Result<StageManifest, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = Ctx {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Stage" {
        return Err(ctx.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Stage>".to_string(),
            root,
        ));
    }

    let mut seen_sections = HashSet::<&str>::new();
    let mut model: Option<ModelDef> = None;
    let mut clips = Vec::new();
    let mut locations = Vec::new();
    let mut objects = Vec::new();
    let mut interactables = Vec::new();

    for section in root.children().filter(|node| node.is_element()) {
        let name = section.tag_name().name();
        if !seen_sections.insert(name) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateSection,
                format!("duplicate section <{name}> in <Stage>"),
                section,
            ));
        }
        match name {
            "Model" => model = Some(parse_model(&ctx, section)?),
            "Clips" => clips = parse_clips(&ctx, section)?,
            "Locations" => locations = parse_locations(&ctx, section)?,
            "Objects" => objects = parse_objects(&ctx, section)?,
            "Interactables" => interactables = parse_interactables(&ctx, section)?,
            _ => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownElement,
                    format!("unknown section <{name}> in <Stage>"),
                    section,
                ))
            }
        }
    }

    let Some(model) = model else {
        return Err(ctx.error(
            ContentErrorCode::MissingSection,
            "missing required section <Model> in <Stage>".to_string(),
            root,
        ));
    };

    for interactable in &interactables {
        if !objects
            .iter()
            .any(|object: &ObjectDef| object.key == interactable.1.object_key)
        {
            return Err(ctx.error(
                ContentErrorCode::UnknownReference,
                format!(
                    "interactable '{}' references unknown object '{}'",
                    interactable.1.name, interactable.1.object_key
                ),
                interactable.0,
            ));
        }
    }

    Ok(StageManifest {
        model,
        clips,
        locations,
        objects,
        interactables: interactables.into_iter().map(|(_, def)| def).collect(),
    })
}

struct Ctx<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl Ctx<'_, '_> {
    fn error(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn check_attributes(
        &self,
        node: Node<'_, '_>,
        allowed: &[&str],
    ) -> Result<(), ContentCompileError> {
        for attribute in node.attributes() {
            if !allowed.contains(&attribute.name()) {
                return Err(self.error(
                    ContentErrorCode::UnknownAttribute,
                    format!(
                        "unknown attribute '{}' on <{}>",
                        attribute.name(),
                        node.tag_name().name()
                    ),
                    node,
                ));
            }
        }
        Ok(())
    }

    fn required_attr(&self, node: Node<'_, '_>, name: &str) -> Result<String, ContentCompileError> {
        let value = node.attribute(name).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(self.error(
                ContentErrorCode::MissingAttribute,
                format!(
                    "missing required attribute '{}' on <{}>",
                    name,
                    node.tag_name().name()
                ),
                node,
            ));
        }
        Ok(value.to_string())
    }

    fn number_attr(
        &self,
        node: Node<'_, '_>,
        name: &str,
        default: Option<f32>,
    ) -> Result<f32, ContentCompileError> {
        let Some(raw) = node.attribute(name) else {
            return match default {
                Some(value) => Ok(value),
                None => Err(self.error(
                    ContentErrorCode::MissingAttribute,
                    format!(
                        "missing required attribute '{}' on <{}>",
                        name,
                        node.tag_name().name()
                    ),
                    node,
                )),
            };
        };
        let parsed = raw.trim().parse::<f32>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("{name} '{raw}' is not a valid number"),
                node,
            )
        })?;
        if !parsed.is_finite() {
            return Err(self.error(
                ContentErrorCode::InvalidValue,
                format!("{name} must be finite"),
                node,
            ));
        }
        Ok(parsed)
    }

    fn position(&self, node: Node<'_, '_>) -> Result<Vec3, ContentCompileError> {
        Ok(Vec3::new(
            self.number_attr(node, "x", None)?,
            self.number_attr(node, "y", Some(0.0))?,
            self.number_attr(node, "z", None)?,
        ))
    }

    fn elements<'n, 'input>(
        &self,
        section: Node<'n, 'input>,
        expected: &str,
    ) -> Result<Vec<Node<'n, 'input>>, ContentCompileError> {
        let mut nodes = Vec::new();
        for child in section.children().filter(|node| node.is_element()) {
            if child.tag_name().name() != expected {
                return Err(self.error(
                    ContentErrorCode::UnknownElement,
                    format!(
                        "unexpected <{}> in <{}>; expected <{}>",
                        child.tag_name().name(),
                        section.tag_name().name(),
                        expected
                    ),
                    child,
                ));
            }
            nodes.push(child);
        }
        Ok(nodes)
    }
}

fn parse_model(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<ModelDef, ContentCompileError> {
    ctx.check_attributes(node, &["asset", "width", "height", "depth"])?;
    let asset = ctx.required_attr(node, "asset")?;
    let size = Vec3::new(
        ctx.number_attr(node, "width", Some(0.6))?,
        ctx.number_attr(node, "height", Some(1.8))?,
        ctx.number_attr(node, "depth", Some(0.4))?,
    );
    if size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0 {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            "model extents must be > 0".to_string(),
            node,
        ));
    }
    Ok(ModelDef { asset, size })
}

fn parse_clips(ctx: &Ctx<'_, '_>, section: Node<'_, '_>) -> Result<Vec<ClipDef>, ContentCompileError> {
    let mut seen = HashSet::<AnimationKind>::new();
    let mut clips = Vec::new();
    for node in ctx.elements(section, "Clip")? {
        ctx.check_attributes(node, &["name", "file", "duration", "loop"])?;
        let name = ctx.required_attr(node, "name")?;
        let Some(kind) = AnimationKind::from_name(&name) else {
            return Err(ctx.error(
                ContentErrorCode::InvalidValue,
                format!("unknown animation '{name}'"),
                node,
            ));
        };
        if !seen.insert(kind) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateName,
                format!("duplicate clip '{name}'"),
                node,
            ));
        }
        let file = ctx.required_attr(node, "file")?;
        let duration_seconds = ctx.number_attr(node, "duration", None)?;
        if duration_seconds <= 0.0 {
            return Err(ctx.error(
                ContentErrorCode::InvalidValue,
                "duration must be > 0".to_string(),
                node,
            ));
        }
        let loop_policy = match node.attribute("loop") {
            None => kind.default_loop_policy(),
            Some(value) => LoopPolicy::from_name(value.trim()).ok_or_else(|| {
                ctx.error(
                    ContentErrorCode::InvalidValue,
                    format!("invalid loop '{value}'; allowed values: repeat, once"),
                    node,
                )
            })?,
        };
        clips.push(ClipDef {
            kind,
            file,
            duration_seconds,
            loop_policy,
        });
    }
    Ok(clips)
}

fn parse_locations(
    ctx: &Ctx<'_, '_>,
    section: Node<'_, '_>,
) -> Result<Vec<LocationDef>, ContentCompileError> {
    let mut seen = HashSet::<String>::new();
    let mut locations = Vec::new();
    for node in ctx.elements(section, "Location")? {
        ctx.check_attributes(node, &["name", "x", "y", "z"])?;
        let name = ctx.required_attr(node, "name")?;
        if !seen.insert(name.clone()) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateName,
                format!("duplicate location '{name}'"),
                node,
            ));
        }
        let position = ctx.position(node)?;
        locations.push(LocationDef { name, position });
    }
    Ok(locations)
}

fn parse_objects(
    ctx: &Ctx<'_, '_>,
    section: Node<'_, '_>,
) -> Result<Vec<ObjectDef>, ContentCompileError> {
    let mut seen = HashSet::<String>::new();
    let mut objects = Vec::new();
    for node in section.children().filter(|node| node.is_element()) {
        let kind = match node.tag_name().name() {
            "Light" => {
                ctx.check_attributes(node, &["key", "x", "y", "z", "intensity", "onIntensity"])?;
                let intensity = ctx.number_attr(node, "intensity", Some(0.0))?;
                let on_intensity = ctx.number_attr(node, "onIntensity", Some(5.0))?;
                if intensity < 0.0 || on_intensity <= 0.0 {
                    return Err(ctx.error(
                        ContentErrorCode::InvalidValue,
                        "light intensity must be >= 0 and onIntensity > 0".to_string(),
                        node,
                    ));
                }
                ObjectDefKind::Light {
                    intensity,
                    on_intensity,
                }
            }
            "Door" => {
                ctx.check_attributes(node, &["key", "x", "y", "z", "open"])?;
                let open = match node.attribute("open").map(str::trim) {
                    None | Some("false") => false,
                    Some("true") => true,
                    Some(other) => {
                        return Err(ctx.error(
                            ContentErrorCode::InvalidValue,
                            format!("invalid open '{other}'; allowed values: true, false"),
                            node,
                        ))
                    }
                };
                ObjectDefKind::Door { open }
            }
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownElement,
                    format!("unsupported object <{other}>; supported: <Light>, <Door>"),
                    node,
                ))
            }
        };
        let key = ctx.required_attr(node, "key")?;
        if !seen.insert(key.clone()) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateName,
                format!("duplicate object key '{key}'"),
                node,
            ));
        }
        let position = ctx.position(node)?;
        objects.push(ObjectDef {
            key,
            kind,
            position,
        });
    }
    Ok(objects)
}

fn parse_interactables<'n, 'input>(
    ctx: &Ctx<'_, '_>,
    section: Node<'n, 'input>,
) -> Result<Vec<(Node<'n, 'input>, InteractableDef)>, ContentCompileError> {
    let mut seen = HashSet::<String>::new();
    let mut interactables = Vec::new();
    for node in ctx.elements(section, "Interactable")? {
        ctx.check_attributes(node, &["name", "object"])?;
        let name = ctx.required_attr(node, "name")?;
        if !seen.insert(name.clone()) {
            return Err(ctx.error(
                ContentErrorCode::DuplicateName,
                format!("duplicate interactable '{name}'"),
                node,
            ));
        }
        let object_key = ctx.required_attr(node, "object")?;
        interactables.push((node, InteractableDef { name, object_key }));
    }
    Ok(interactables)
}

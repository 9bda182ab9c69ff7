use std::path::{Path, PathBuf};

use npc_engine::{resolve_app_paths, Frontend, LoopConfig, StartupError};
use npc_link::fixtures::ScenarioId;
use npc_link::{BackendHandle, LinkError, RestClient, DEFAULT_BASE_URL};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::controllers::setup::CharacterForm;
use super::controllers::speech::{ConsoleSynthesizer, SpeechAdapter, Voice};
use super::frontend::DemoFrontend;

const BACKEND_URL_ENV_VAR: &str = "NPC_DEMO_BACKEND_URL";
const NAME_ENV_VAR: &str = "NPC_DEMO_NAME";
const BACKGROUND_ENV_VAR: &str = "NPC_DEMO_BACKGROUND";
const BEHAVIOR_ENV_VAR: &str = "NPC_DEMO_BEHAVIOR";
const STORY_FILE_ENV_VAR: &str = "NPC_DEMO_STORY_FILE";
const BEHAVIOR_SCRIPT_ENV_VAR: &str = "NPC_DEMO_BEHAVIOR_SCRIPT";
const IMAGE_FILE_ENV_VAR: &str = "NPC_DEMO_IMAGE_FILE";
const SCENARIO_ENV_VAR: &str = "NPC_DEMO_SCENARIO";
const TTS_ENV_VAR: &str = "NPC_DEMO_TTS";
const VOICES_ENV_VAR: &str = "NPC_DEMO_VOICES";

const DEFAULT_VOICES: [(&str, &str); 2] = [
    ("Google US English", "en-US"),
    ("Console Narrator", "en-GB"),
];

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Everything the demo reads from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DemoConfig {
    pub(crate) backend_url: String,
    pub(crate) form: CharacterForm,
    pub(crate) speech_enabled: bool,
    pub(crate) voices: Vec<Voice>,
}

impl DemoConfig {
    pub(crate) fn from_env(fixtures_dir: &Path) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), fixtures_dir)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>, fixtures_dir: &Path) -> Self {
        let text = |key: &str| lookup(key).unwrap_or_default();
        let path = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .map(PathBuf::from)
        };

        let behavior_script = path(BEHAVIOR_SCRIPT_ENV_VAR)
            .or_else(|| scenario_script(lookup(SCENARIO_ENV_VAR).as_deref(), fixtures_dir));

        Self {
            backend_url: lookup(BACKEND_URL_ENV_VAR)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            form: CharacterForm {
                name: text(NAME_ENV_VAR),
                background: text(BACKGROUND_ENV_VAR),
                behavior: text(BEHAVIOR_ENV_VAR),
                story_file: path(STORY_FILE_ENV_VAR),
                behavior_script,
                image_file: path(IMAGE_FILE_ENV_VAR),
            },
            speech_enabled: parse_toggle(lookup(TTS_ENV_VAR).as_deref()),
            voices: lookup(VOICES_ENV_VAR)
                .map(|raw| parse_voices(&raw))
                .filter(|voices| !voices.is_empty())
                .unwrap_or_else(|| {
                    DEFAULT_VOICES
                        .iter()
                        .map(|(name, lang)| Voice::new(*name, *lang))
                        .collect()
                }),
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) frontend: Box<dyn Frontend>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== NPC Demo Startup ===");

    let paths = resolve_app_paths()?;
    let demo = DemoConfig::from_env(&paths.fixtures_dir);
    info!(
        root = %paths.root.display(),
        backend_url = %demo.backend_url,
        speech_output = demo.speech_enabled,
        "demo_config_resolved"
    );

    let backend = BackendHandle::spawn(RestClient::new(&demo.backend_url)?)?;
    let speech = SpeechAdapter::new(
        Box::new(ConsoleSynthesizer::new(demo.voices)),
        None,
        demo.speech_enabled,
    );
    let frontend = DemoFrontend::new(Box::new(backend), speech, demo.form);

    Ok(AppWiring {
        config: LoopConfig {
            stage_manifest_path: Some(paths.stage_manifest_path()),
            ..LoopConfig::default()
        },
        frontend: Box::new(frontend),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Unset or unrecognized values leave speech on.
fn parse_toggle(raw: Option<&str>) -> bool {
    match raw.map(|raw| raw.trim().to_ascii_lowercase()) {
        Some(value) if matches!(value.as_str(), "0" | "false" | "off" | "no") => false,
        Some(value) if matches!(value.as_str(), "" | "1" | "true" | "on" | "yes") => true,
        Some(value) => {
            warn!(var = TTS_ENV_VAR, value = %value, "config_value_unrecognized");
            true
        }
        None => true,
    }
}

/// `name@lang` entries separated by commas. Entries without `@` get an empty language.
fn parse_voices(raw: &str) -> Vec<Voice> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.rsplit_once('@') {
            Some((name, lang)) => Voice::new(name.trim(), lang.trim()),
            None => Voice::new(entry, ""),
        })
        .collect()
}

fn scenario_script(key: Option<&str>, fixtures_dir: &Path) -> Option<PathBuf> {
    let key = key?;
    match ScenarioId::from_key(key) {
        Some(id) => Some(fixtures_dir.join(id.file_name())),
        None => {
            warn!(var = SCENARIO_ENV_VAR, value = %key, "scenario_unknown");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use npc_link::fixtures::scenario;

    use super::*;
    use crate::app::controllers::test_support::{repo_root, test_scene};

    fn config_from(pairs: &[(&str, &str)]) -> DemoConfig {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        DemoConfig::from_lookup(|key| vars.get(key).cloned(), Path::new("/srv/fixtures"))
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.backend_url, DEFAULT_BASE_URL);
        assert_eq!(config.form, CharacterForm::default());
        assert!(config.speech_enabled);
        assert_eq!(
            config.voices,
            vec![
                Voice::new("Google US English", "en-US"),
                Voice::new("Console Narrator", "en-GB"),
            ]
        );
    }

    #[test]
    fn form_and_files_come_from_environment() {
        let config = config_from(&[
            (BACKEND_URL_ENV_VAR, " http://npc.local:9000 "),
            (NAME_ENV_VAR, "Leo"),
            (BACKGROUND_ENV_VAR, "Store Manager Android"),
            (STORY_FILE_ENV_VAR, "/tmp/story.txt"),
            (IMAGE_FILE_ENV_VAR, "  "),
            (TTS_ENV_VAR, "off"),
        ]);
        assert_eq!(config.backend_url, "http://npc.local:9000");
        assert_eq!(config.form.name, "Leo");
        assert_eq!(config.form.background, "Store Manager Android");
        assert_eq!(config.form.story_file, Some(PathBuf::from("/tmp/story.txt")));
        assert_eq!(config.form.image_file, None);
        assert!(!config.speech_enabled);
    }

    #[test]
    fn scenario_selects_fixture_script_unless_overridden() {
        let config = config_from(&[(SCENARIO_ENV_VAR, "supermarket_world")]);
        assert_eq!(
            config.form.behavior_script,
            Some(PathBuf::from("/srv/fixtures/supermarket_world.cs"))
        );

        let config = config_from(&[
            (SCENARIO_ENV_VAR, "tomb"),
            (BEHAVIOR_SCRIPT_ENV_VAR, "/tmp/mine.cs"),
        ]);
        assert_eq!(config.form.behavior_script, Some(PathBuf::from("/tmp/mine.cs")));

        assert_eq!(config_from(&[(SCENARIO_ENV_VAR, "atlantis")]).form.behavior_script, None);
    }

    #[test]
    fn toggle_values() {
        for raw in ["0", "false", "OFF", "no"] {
            assert!(!parse_toggle(Some(raw)), "{raw}");
        }
        for raw in ["1", "true", "On", "yes", "maybe"] {
            assert!(parse_toggle(Some(raw)), "{raw}");
        }
        assert!(parse_toggle(None));
    }

    #[test]
    fn voice_list_parses_name_at_lang() {
        assert_eq!(
            parse_voices("Google US English@en-US, Samantha@en-US,,Plain"),
            vec![
                Voice::new("Google US English", "en-US"),
                Voice::new("Samantha", "en-US"),
                Voice::new("Plain", ""),
            ]
        );
        assert_eq!(config_from(&[(VOICES_ENV_VAR, " , ")]).voices.len(), 2);
    }

    #[test]
    fn every_scenario_ships_a_fixture_file() {
        let fixtures = repo_root().join("assets").join("fixtures");
        for id in ScenarioId::ALL {
            assert!(fixtures.join(id.file_name()).is_file(), "{}", id.file_name());
        }
    }

    #[test]
    fn supermarket_world_coordinates_match_stage_locations() {
        let scene = test_scene();
        let world = scenario(ScenarioId::SupermarketWorld);
        assert_eq!(world.coordinates.len(), scene.locations().len());
        for (name, [x, y, z]) in world.coordinates {
            let position = scene
                .location(name)
                .unwrap_or_else(|| panic!("stage is missing location '{name}'"));
            assert_eq!((position.x, position.y, position.z), (*x, *y, *z), "{name}");
        }
    }
}

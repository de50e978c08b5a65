use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use sage_engine::{
    load_json_document, parse_json_document, parse_script, resolve_app_paths, AppError,
    LoopConfig, SceneKey, ScriptedInput,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, GameContent, SceneEntry};

const CONTENT_ENV_VAR: &str = "SAGE_CONTENT";
const SCRIPT_ENV_VAR: &str = "SAGE_SCRIPT";
const EMBEDDED_CONTENT: &str = include_str!("../../../../assets/content/game.json");
const EMBEDDED_CONTENT_LABEL: &str = "<embedded>/assets/content/game.json";

/// Played when no script is given: skip the intro, enter chapter 1, answer the
/// first villager, pick up the stone and walk through the portal.
pub(crate) const DEMO_SCRIPT: &str = "\
# intro story
press cancel
wait 1
# chapter 1 and its intro page
press interact
press interact
wait 1
hold right 75
press interact
press interact
press interact
press interact
press interact
press interact
press interact
press interact
press interact
press down
press down
press interact
press interact
hold right 60
press interact
hold right 75
press interact
wait 45
quit
";

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GameConfig {
    pub(crate) content_path: Option<PathBuf>,
    pub(crate) script_path: Option<PathBuf>,
    pub(crate) start_scene: Option<String>,
    pub(crate) max_ticks: Option<u64>,
    pub(crate) realtime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown argument '{0}'\nusage: sage_game [--content <path>] [--script <path>] [--start <sceneKey>] [--max-ticks <n>] [--realtime]")]
    UnknownArgument(String),
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl GameConfig {
    /// Flags win over environment variables.
    pub(crate) fn from_sources(
        args: impl IntoIterator<Item = String>,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = GameConfig {
            content_path: non_empty(env_lookup(CONTENT_ENV_VAR)).map(PathBuf::from),
            script_path: non_empty(env_lookup(SCRIPT_ENV_VAR)).map(PathBuf::from),
            ..GameConfig::default()
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--content" => config.content_path = Some(PathBuf::from(value_for(&arg, &mut args)?)),
                "--script" => config.script_path = Some(PathBuf::from(value_for(&arg, &mut args)?)),
                "--start" => config.start_scene = Some(value_for(&arg, &mut args)?),
                "--max-ticks" => {
                    let raw = value_for(&arg, &mut args)?;
                    let ticks = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                        flag: arg.clone(),
                        value: raw.clone(),
                    })?;
                    config.max_ticks = Some(ticks);
                }
                "--realtime" => config.realtime = true,
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            }
        }
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn value_for(flag: &str, args: &mut impl Iterator<Item = String>) -> Result<String, ConfigError> {
    args.next()
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) content: Rc<GameContent>,
    pub(crate) start: SceneKey,
    pub(crate) start_entry: SceneEntry,
    pub(crate) input: ScriptedInput,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Sage Startup ===");

    let game_config = GameConfig::from_sources(std::env::args().skip(1), |var| {
        std::env::var(var).ok()
    })?;
    debug!(config = ?game_config, "config_resolved");

    let content = Rc::new(load_content(game_config.content_path.as_deref())?);
    for issue in gameplay::validate_content(&content) {
        warn!(issue = %issue, "content_warning");
    }

    let input = load_input(game_config.script_path.as_deref())?;
    let start = SceneKey::new(
        game_config
            .start_scene
            .clone()
            .unwrap_or_else(|| content.start_scene.clone()),
    );
    let (start, start_entry) = gameplay::initial_route(&content, &start);
    info!(
        start = %start,
        scenes = content.scenes.len(),
        chapters = content.chapters.len(),
        steps = input.remaining(),
        "app_ready"
    );

    Ok(AppWiring {
        config: LoopConfig {
            max_ticks: game_config.max_ticks,
            pace_realtime: game_config.realtime,
            ..LoopConfig::default()
        },
        content,
        start,
        start_entry,
        input,
    })
}

/// An explicit path, then the project's assets file, then the copy built into
/// the binary.
fn load_content(explicit: Option<&Path>) -> Result<GameContent, AppError> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "content_source");
        return Ok(load_json_document(path)?);
    }
    match resolve_app_paths() {
        Ok(paths) if paths.default_content_file().is_file() => {
            let path = paths.default_content_file();
            info!(path = %path.display(), "content_source");
            return Ok(load_json_document(&path)?);
        }
        Ok(paths) => debug!(dir = %paths.content_dir.display(), "no_content_file_on_disk"),
        Err(err) => debug!(error = %err, "project_root_not_found"),
    }
    info!(path = EMBEDDED_CONTENT_LABEL, "content_source");
    Ok(parse_json_document(
        EMBEDDED_CONTENT,
        Path::new(EMBEDDED_CONTENT_LABEL),
    )?)
}

fn load_input(script_path: Option<&Path>) -> Result<ScriptedInput, AppError> {
    let source = match script_path {
        Some(path) => fs::read_to_string(path).map_err(|source| AppError::ReadScript {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            info!("using built-in demo script");
            DEMO_SCRIPT.to_string()
        }
    };
    let steps = parse_script(&source)?;
    Ok(ScriptedInput::from_steps(&steps))
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

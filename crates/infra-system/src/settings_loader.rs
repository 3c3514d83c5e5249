// Settings loader
// reason: config crate layers defaults, an optional TOML file and PHONETOOL_* env vars

use config::{Config, Environment, File, FileFormat, Map};
use directories::{ProjectDirs, UserDirs};
use phonetool_core::{AppError, Result, Settings};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_PREFIX: &str = "PHONETOOL";
pub const CONFIG_PATH_VAR: &str = "PHONETOOL_CONFIG";
pub const CONFIG_FILE_NAME: &str = "phonetool.toml";
const BACKUP_FOLDER_NAME: &str = "PhoneToolBackups";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "OpenPhoneTool", "phonetool")
}

/// `<config dir>/phonetool.toml`
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// `<data dir>/tools`
pub fn default_tools_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("tools"))
}

/// `<documents>/PhoneToolBackups`, falling back to the home directory
pub fn default_backup_dir() -> PathBuf {
    UserDirs::new()
        .map(|dirs| {
            dirs.document_dir()
                .unwrap_or_else(|| dirs.home_dir())
                .join(BACKUP_FOLDER_NAME)
        })
        .unwrap_or_else(|| PathBuf::from(BACKUP_FOLDER_NAME))
}

/// Load settings: defaults, then the config file, then the environment
///
/// An explicit path must exist. Without one, `PHONETOOL_CONFIG` or the
/// per-user config file is read when present.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let (file, required) = match explicit {
        Some(path) => (Some(path.to_path_buf()), true),
        None => (
            std::env::var_os(CONFIG_PATH_VAR)
                .map(PathBuf::from)
                .or_else(default_config_file),
            false,
        ),
    };

    load_from(file.as_deref(), required, None)
}

/// `env_override` replaces the process environment (tests)
pub(crate) fn load_from(
    file: Option<&Path>,
    required: bool,
    env_override: Option<Map<String, String>>,
) -> Result<Settings> {
    let mut builder = Config::builder()
        .set_default("backup_dir", default_backup_dir().to_string_lossy().into_owned())
        .map_err(config_error)?;

    if let Some(tools_dir) = default_tools_dir() {
        builder = builder
            .set_default("tools_dir", tools_dir.to_string_lossy().into_owned())
            .map_err(config_error)?;
    }

    if let Some(path) = file {
        debug!(path = %path.display(), required = required, "Reading config file");
        builder = builder.add_source(
            File::from(path)
                .format(FileFormat::Toml)
                .required(required),
        );
    }

    let settings: Settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env_override),
        )
        .build()
        .map_err(config_error)?
        .try_deserialize()
        .map_err(config_error)?;

    let settings = expand_paths(settings);
    settings.validate()?;
    Ok(settings)
}

fn config_error(e: config::ConfigError) -> AppError {
    AppError::Config(e.to_string())
}

fn expand(path: PathBuf) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn expand_paths(settings: Settings) -> Settings {
    Settings {
        tools_dir: settings.tools_dir.map(expand),
        backup_dir: expand(settings.backup_dir),
        log_dir: settings.log_dir.map(expand),
        ..settings
    }
}

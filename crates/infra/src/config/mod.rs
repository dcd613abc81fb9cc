//! Persisted server config: listener settings plus the API user list.
//!
//! The file is JSON with kebab-case keys. A `file-version` tag lets newer
//! builds detect an older layout and rewrite the file once in the current one.
//!
//! Loading never aborts on a single bad user entry: malformed records are
//! skipped with a warning and the remaining users are loaded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use arenagate_auth::{CredentialStore, DEFAULT_USERNAME, Permission, PermissionRegistry, Secret, User};

/// Current on-disk layout version.
pub const CONFIG_VERSION: i64 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write config {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("config {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Listener and runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// `"*"` allows any origin.
    pub allowed_cors_origins: Vec<String>,
    /// Upper bound for a single backend call. `None` waits indefinitely.
    pub backend_timeout_secs: Option<u64>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8084,
            allowed_cors_origins: Vec::new(),
            backend_timeout_secs: None,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    #[serde(default)]
    file_version: Option<i64>,
    #[serde(flatten)]
    settings: ServerSettings,
    /// Written for operators' reference; ignored on load.
    #[serde(default)]
    available_permissions: Vec<String>,
    /// Kept raw so one malformed entry cannot fail the whole file.
    #[serde(default)]
    users: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    username: String,
    password: String,
    permissions: Vec<String>,
}

/// Startup load.
///
/// - Missing file: seed the default account, write a fresh file, return defaults.
/// - Present file: replace the store with its users; rewrite the file if its
///   version differs from [`CONFIG_VERSION`].
/// - Unparseable file: error, and the file is left untouched.
pub fn load_or_init(
    path: &Path,
    store: &CredentialStore,
    registry: &PermissionRegistry,
) -> Result<ServerSettings, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            store.seed_default(registry);
            tracing::warn!(
                path = %path.display(),
                username = DEFAULT_USERNAME,
                "no config found; generated a default account (password is in the config file)"
            );
            let settings = ServerSettings::default();
            save(path, &settings, store, registry)?;
            return Ok(settings);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file = parse(path, &raw)?;
    store.replace_all(decode_users(file.users, registry));

    if file.file_version != Some(CONFIG_VERSION) {
        tracing::info!(
            from = ?file.file_version,
            to = CONFIG_VERSION,
            "rewriting config in the current layout"
        );
        save(path, &file.settings, store, registry)?;
    }

    Ok(file.settings)
}

/// Administrative reload: re-read the users and swap them into the store.
///
/// Listener settings are not re-applied. Returns the number of loaded users.
pub fn reload(
    path: &Path,
    store: &CredentialStore,
    registry: &PermissionRegistry,
) -> Result<usize, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse(path, &raw)?;

    let users = decode_users(file.users, registry);
    let count = users.len();
    store.replace_all(users);
    tracing::info!(users = count, path = %path.display(), "users reloaded");
    Ok(count)
}

/// Write the settings and the store's current users.
///
/// The file is written next to its final location and renamed into place.
pub fn save(
    path: &Path,
    settings: &ServerSettings,
    store: &CredentialStore,
    registry: &PermissionRegistry,
) -> Result<(), ConfigError> {
    let mut users = store.all();
    users.sort_by_key(|u| u.key());

    let users = users
        .iter()
        .map(|u| {
            serde_json::to_value(UserRecord {
                username: u.username().to_string(),
                password: u.secret().expose().to_string(),
                permissions: u.permissions().iter().map(|p| p.as_str().to_string()).collect(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let file = ConfigFile {
        file_version: Some(CONFIG_VERSION),
        settings: settings.clone(),
        available_permissions: registry.iter().map(|p| p.as_str().to_string()).collect(),
        users,
    };
    let encoded = serde_json::to_string_pretty(&file)?;

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, encoded).map_err(write_err)?;
    restrict_permissions(&tmp).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;

    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}

/// The file holds plaintext secrets; keep it owner-only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn parse(path: &Path, raw: &str) -> Result<ConfigFile, ConfigError> {
    serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_users(entries: Vec<Value>, registry: &PermissionRegistry) -> Vec<User> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match decode_user(entry, registry) {
            Ok(user) => Some(user),
            Err(reason) => {
                tracing::warn!(index, %reason, "skipped entry within \"users\"");
                None
            }
        })
        .collect()
}

fn decode_user(entry: Value, registry: &PermissionRegistry) -> Result<User, String> {
    let record: UserRecord =
        serde_json::from_value(entry).map_err(|e| format!("missing or invalid fields: {e}"))?;

    let permissions = record
        .permissions
        .into_iter()
        .map(Permission::parse)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    for p in permissions.iter().filter(|p| !registry.contains(p)) {
        tracing::warn!(
            username = %record.username,
            permission = %p,
            "user holds a permission no route checks"
        );
    }

    User::new(record.username, Secret::new(record.password), permissions).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use arenagate_auth::permissions::{ARENAS_READ, SERVERS_READ};

    fn write_json(path: &Path, value: Value) {
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_seeds_default_account_and_writes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("configs.json");
        let registry = PermissionRegistry::builtin();
        let store = CredentialStore::new();

        let settings = load_or_init(&path, &store, &registry).unwrap();
        assert_eq!(settings, ServerSettings::default());

        let default = store.lookup(DEFAULT_USERNAME).unwrap();
        assert_eq!(default.permissions(), registry.register_all());

        let written = read_json(&path);
        assert_eq!(written["file-version"], CONFIG_VERSION);
        assert_eq!(written["users"][0]["username"], "default");
        assert_eq!(written["users"][0]["password"], default.secret().expose());
        assert_eq!(written["available-permissions"].as_array().unwrap().len(), registry.len());
    }

    #[test]
    fn persisted_users_replace_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.json");
        write_json(
            &path,
            json!({
                "file-version": CONFIG_VERSION,
                "host": "0.0.0.0",
                "port": 9000,
                "allowed-cors-origins": ["*"],
                "users": [
                    { "username": "admin", "password": "s3cret", "permissions": ["arenas.read"] }
                ]
            }),
        );

        let registry = PermissionRegistry::builtin();
        let store = CredentialStore::new();
        store.seed_default(&registry);

        let settings = load_or_init(&path, &store, &registry).unwrap();
        assert_eq!(settings.bind_addr(), "0.0.0.0:9000");
        assert_eq!(settings.allowed_cors_origins, vec!["*".to_string()]);
        assert!(store.lookup(DEFAULT_USERNAME).is_none());

        let admin = store.lookup("ADMIN").unwrap();
        assert!(admin.secret().matches("s3cret"));
        assert!(admin.permissions().contains(&ARENAS_READ));
    }

    #[test]
    fn malformed_user_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.json");
        write_json(
            &path,
            json!({
                "file-version": CONFIG_VERSION,
                "users": [
                    "not a section",
                    { "username": "nopass", "permissions": [] },
                    { "username": "badperm", "password": "x", "permissions": ["Servers.READ"] },
                    { "username": "", "password": "x", "permissions": [] },
                    { "username": "ok", "password": "x", "permissions": ["servers.read"] }
                ]
            }),
        );

        let registry = PermissionRegistry::builtin();
        let store = CredentialStore::new();
        load_or_init(&path, &store, &registry).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.lookup("ok").unwrap().permissions().contains(&SERVERS_READ));
    }

    #[test]
    fn old_version_is_rewritten_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.json");
        write_json(
            &path,
            json!({
                "file-version": 1,
                "port": 9100,
                "users": [{ "username": "admin", "password": "pw", "permissions": [] }]
            }),
        );

        let registry = PermissionRegistry::builtin();
        let store = CredentialStore::new();
        load_or_init(&path, &store, &registry).unwrap();

        let rewritten = read_json(&path);
        assert_eq!(rewritten["file-version"], CONFIG_VERSION);
        assert_eq!(rewritten["port"], 9100);
        assert_eq!(rewritten["users"][0]["password"], "pw");
    }

    #[test]
    fn invalid_json_is_an_error_and_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_or_init(&path, &CredentialStore::new(), &PermissionRegistry::builtin()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn reload_swaps_users() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.json");
        let registry = PermissionRegistry::builtin();
        let store = CredentialStore::new();
        load_or_init(&path, &store, &registry).unwrap();
        assert!(store.lookup(DEFAULT_USERNAME).is_some());

        write_json(
            &path,
            json!({
                "file-version": CONFIG_VERSION,
                "users": [{ "username": "ops", "password": "pw", "permissions": ["servers.read"] }]
            }),
        );

        assert_eq!(reload(&path, &store, &registry).unwrap(), 1);
        assert!(store.lookup(DEFAULT_USERNAME).is_none());
        assert!(store.lookup("ops").is_some());
    }

    #[test]
    fn reload_without_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = reload(
            &dir.path().join("missing.json"),
            &CredentialStore::new(),
            &PermissionRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, expand::Decoration, policy::AdminAllowList, Result};

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Transport
    pub telegram_bot_token: String,

    // Lists
    pub admins: AdminAllowList,
    pub decoration: Decoration,
    pub prepend_username: bool,
    pub recurse: bool,
    pub role_shim: bool,

    // State
    pub state_file: PathBuf,
    pub save_interval: Duration,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admins = AdminAllowList::parse(&get("LIST_ADMINS").unwrap_or_default());

        let raw_decoration = get("LIST_DECORATOR").unwrap_or_default();
        let decoration = Decoration::parse(&raw_decoration).unwrap_or_else(|| {
            tracing::warn!(
                value = raw_decoration.as_str(),
                "LIST_DECORATOR must be one of <, (, [, {{; using no decoration"
            );
            Decoration::None
        });

        let prepend_username = get("LIST_PREPEND_USERNAME")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);
        let recurse = get("LIST_RECURSE").map(|s| parse_bool(&s)).unwrap_or(true);
        let role_shim = get("LIST_AUTH").map(|s| parse_bool(&s)).unwrap_or(false);

        let state_file = PathBuf::from(
            get("LIST_STATE_FILE").unwrap_or("/tmp/listbot-state.json".to_string()),
        );
        let save_interval = Duration::from_millis(
            get("LIST_SAVE_INTERVAL_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(5_000)
                .max(100),
        );

        let audit_log_path = PathBuf::from(
            get("AUDIT_LOG_PATH").unwrap_or("/tmp/listbot-audit.log".to_string()),
        );
        let audit_log_json = get("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            admins,
            decoration,
            prepend_username,
            recurse,
            role_shim,
            state_file,
            save_interval,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

//! `%token%` expansion for paths and file names.
//!
//! Built-in tokens: `%guid%`, `%date%`, `%time%`, `%datetime%`. Any other
//! token is looked up in the message parameters (case-insensitive). Unknown
//! tokens are left as written.

use crate::message::ParamBag;
use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"%([A-Za-z][A-Za-z0-9_]*)%").expect("valid token regex"))
}

/// Expand tokens using the current local time.
pub fn expand(template: &str, params: &ParamBag) -> String {
    expand_at(template, params, Local::now())
}

pub fn expand_at(template: &str, params: &ParamBag, now: DateTime<Local>) -> String {
    token_regex()
        .replace_all(template, |caps: &Captures| {
            let token = &caps[1];
            match token.to_ascii_lowercase().as_str() {
                "guid" => uuid::Uuid::new_v4().to_string(),
                "date" => now.format("%Y-%m-%d").to_string(),
                "time" => now.format("%H%M%S").to_string(),
                "datetime" => now.format("%Y%m%d%H%M%S").to_string(),
                _ => params
                    .get_ignore_case(token)
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

/// Expand tilde (~) in paths to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if path_str == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else if let Some(rest) = path_str
        .strip_prefix("~/")
        .or_else(|| path_str.strip_prefix("~\\"))
    {
        if let Some(home) = dirs::home_dir() {
            home.join(rest)
        } else {
            path.to_path_buf()
        }
    } else {
        path.to_path_buf()
    }
}

/// Expand tokens and a leading tilde in a directory setting.
pub fn expand_path(template: &str, params: &ParamBag) -> PathBuf {
    expand_tilde(Path::new(&expand(template, params)))
}

//! Repository URL resolution for the "View Repository" button.
//!
//! Reads git metadata straight from disk (no `git` subprocess): walk up to
//! the `.git` entry, follow `gitdir:` / `commondir` indirections used by
//! worktrees, then scan the shared `config` for `[remote "..."]` sections.

use fs_err as fs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

const PREFERRED_REMOTE: &str = "origin";
const GITHUB_HOST: &str = "github.com";

static RE_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[\s*([^\]\s"]+)(?:\s+"([^"]*)")?\s*\]"#).unwrap());
static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^url\s*=\s*(.+?)\s*$"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// Fetch URL of `origin`, else of the first remote pointing at GitHub.
///
/// Returns `None` outside a repository or when neither remote exists.
pub fn resolve_repository_url(workspace_root: &Path) -> Option<String> {
    repository_url_from_config(&find_git_config(workspace_root)?)
}

/// Same selection as [`resolve_repository_url`], for an already located
/// git `config` file.
pub fn repository_url_from_config(config_path: &Path) -> Option<String> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::debug!(error = %err, "Failed to read git config");
            return None;
        }
    };
    select_remote_url(&parse_remotes(&contents))
}

pub fn select_remote_url(remotes: &[Remote]) -> Option<String> {
    remotes
        .iter()
        .find(|remote| remote.name == PREFERRED_REMOTE)
        .or_else(|| remotes.iter().find(|remote| remote.url.contains(GITHUB_HOST)))
        .map(|remote| remote.url.clone())
}

/// Remotes in file order. Only the first `url` of each remote counts; later
/// sections with the same name are ignored.
pub fn parse_remotes(config: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();
    let mut current: Option<String> = None;

    for raw_line in config.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(caps) = RE_SECTION.captures(line) {
            let section = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
            current = match (section.as_deref(), caps.get(2)) {
                (Some("remote"), Some(name)) => Some(name.as_str().to_string()),
                _ => None,
            };
            continue;
        }

        let name = match &current {
            Some(name) => name,
            None => continue,
        };
        if remotes.iter().any(|remote| &remote.name == name) {
            continue;
        }
        if let Some(caps) = RE_URL.captures(line) {
            let url = caps[1].trim_matches('"').to_string();
            if !url.is_empty() {
                remotes.push(Remote {
                    name: name.clone(),
                    url,
                });
            }
        }
    }

    remotes
}

/// Path of the repository's shared `config` file for `start` or any parent.
pub fn find_git_config(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start.to_path_buf());
    while let Some(dir) = current {
        let git_entry = dir.join(".git");
        if git_entry.is_dir() {
            return Some(git_entry.join("config"));
        }
        if git_entry.is_file() {
            let git_dir = parse_gitdir(&git_entry, &dir)?;
            let common_dir = parse_commondir(&git_dir).unwrap_or(git_dir);
            return Some(common_dir.join("config"));
        }

        let parent = dir.parent().map(|p| p.to_path_buf());
        if parent.as_ref() == Some(&dir) {
            break;
        }
        current = parent;
    }
    None
}

fn parse_gitdir(git_file: &Path, worktree_root: &Path) -> Option<PathBuf> {
    let contents = fs::read_to_string(git_file).ok()?;
    let line = contents
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("gitdir:"))?;
    let raw = line.get("gitdir:".len()..)?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(resolve_git_path(worktree_root, raw))
}

fn parse_commondir(git_dir: &Path) -> Option<PathBuf> {
    let contents = fs::read_to_string(git_dir.join("commondir")).ok()?;
    let raw = contents.trim();
    if raw.is_empty() {
        return None;
    }
    Some(resolve_git_path(git_dir, raw))
}

fn resolve_git_path(base: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

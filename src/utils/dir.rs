use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

const APPLICATION_DIR: &str = "timeflow";

/// Resolves the default application directory and makes sure it exists.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = default_application_path()?;
    ensure_dir(path)
}

pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(windows)]
fn default_application_path() -> Result<PathBuf> {
    let mut path = env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("APPDATA should be present on Windows"))?;
    path.push(APPLICATION_DIR);
    Ok(path)
}

#[cfg(not(windows))]
fn default_application_path() -> Result<PathBuf> {
    let mut path = env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
    path.push(APPLICATION_DIR);
    Ok(path)
}

//! Atomic placement of finished downloads.
//!
//! A transfer never writes the final path directly: it lands in a private
//! staging file first and is moved into place with one atomic rename, so no
//! partial file is ever observable at the destination.

use std::{
    env, fs,
    io::{ErrorKind, Result as IoResult},
    path::{Path, PathBuf},
};

use rand::{distributions::Alphanumeric, thread_rng, Rng};

const FILE_NAME_PREFIX: &str = ".http-session-";

fn random_file_name() -> String {
    let suffix: String = thread_rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect();
    format!("{}{}", FILE_NAME_PREFIX, suffix)
}

/// Reserves a fresh private staging file for a transfer.
///
/// The path lives in the destination's directory when one was requested
/// (keeping the final rename on one filesystem), otherwise in the system
/// temporary directory. The file is created empty at reservation time, so
/// concurrent transfers can never claim the same path; a name collision
/// retries with a fresh name.
pub fn staging_path_for(destination: Option<&Path>) -> IoResult<PathBuf> {
    let dir = destination
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_owned)
        .unwrap_or_else(env::temp_dir);
    loop {
        let candidate = dir.join(random_file_name());
        match fs::OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Moves a completed staging file into its final place.
///
/// With a requested destination this is a single atomic rename; a rename
/// failure is returned as-is, never retried. Without one, a fresh temporary
/// path is chosen (re-chosen only when the name collides with an existing
/// file) and the staging file is renamed there.
pub fn publish(staging: &Path, destination: Option<&Path>) -> IoResult<PathBuf> {
    if let Some(destination) = destination {
        fs::rename(staging, destination)?;
        return Ok(destination.to_owned());
    }
    let temp_dir = env::temp_dir();
    loop {
        let candidate = temp_dir.join(random_file_name());
        if candidate.exists() {
            continue;
        }
        fs::rename(staging, &candidate)?;
        return Ok(candidate);
    }
}

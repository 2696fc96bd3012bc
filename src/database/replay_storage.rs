//! Replay file storage with Zstd compression.
//!
//! Replays are stored as compressed binary files in `{dir}/{hash}.r`.
//! Data is serialized with `bincode` before compression to minimize size.

use crate::error::ReplayError;
use crate::models::replay::{REPLAY_FORMAT_VERSION, ReplayData};
use std::fs;
use std::path::{Path, PathBuf};
use zstd::stream::{decode_all, encode_all};

/// Zstd level for replay files (maximum).
const COMPRESSION_LEVEL: i32 = 21;

/// Get the path for a replay file given its hash.
pub fn replay_path(dir: &Path, hash: &str) -> PathBuf {
    dir.join(format!("{}.r", hash))
}

/// Md5 of the serialized replay, used as its file name.
pub fn replay_hash(data: &ReplayData) -> Result<String, ReplayError> {
    let binary_data = bincode::serde::encode_to_vec(data, bincode::config::standard())?;
    Ok(format!("{:x}", md5::compute(&binary_data)))
}

/// Serializes and compresses a replay.
pub fn encode_replay(data: &ReplayData) -> Result<Vec<u8>, ReplayError> {
    let binary_data = bincode::serde::encode_to_vec(data, bincode::config::standard())?;
    Ok(encode_all(&binary_data[..], COMPRESSION_LEVEL)?)
}

/// Decompresses and deserializes a replay.
pub fn decode_replay(bytes: &[u8]) -> Result<ReplayData, ReplayError> {
    let binary_data = decode_all(bytes)?;
    let (data, _len): (ReplayData, usize) =
        bincode::serde::decode_from_slice(&binary_data, bincode::config::standard())?;

    if data.version != REPLAY_FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion(data.version));
    }
    Ok(data)
}

/// Save replay data to `{dir}/{hash}.r`, creating `dir` if needed.
/// Returns the path of the written file.
pub fn save_replay(dir: &Path, hash: &str, data: &ReplayData) -> Result<PathBuf, ReplayError> {
    fs::create_dir_all(dir)?;
    let path = replay_path(dir, hash);
    save_replay_to_path(&path, data)?;
    Ok(path)
}

/// Save replay data to a specific path.
pub fn save_replay_to_path(path: &Path, data: &ReplayData) -> Result<(), ReplayError> {
    let compressed_data = encode_replay(data)?;
    fs::write(path, compressed_data)?;
    log::info!(
        "REPLAY: Saved {} frames to {:?}",
        data.frames.len(),
        path
    );
    Ok(())
}

/// Load and decompress replay data from file.
pub fn load_replay(dir: &Path, hash: &str) -> Result<ReplayData, ReplayError> {
    load_replay_from_path(&replay_path(dir, hash))
}

/// Load replay data from a specific path.
pub fn load_replay_from_path(path: &Path) -> Result<ReplayData, ReplayError> {
    let bytes = fs::read(path)?;
    decode_replay(&bytes)
}

/// Delete a replay file.
pub fn delete_replay(dir: &Path, hash: &str) -> Result<(), ReplayError> {
    let path = replay_path(dir, hash);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Check if a replay file exists.
pub fn replay_exists(dir: &Path, hash: &str) -> bool {
    replay_path(dir, hash).exists()
}

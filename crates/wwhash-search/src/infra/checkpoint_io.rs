//! Checkpoint file I/O operations
//!
//! Saves go to a sibling temp file that is renamed over the target, so an
//! interrupted save never leaves a half-written checkpoint behind.

use crate::constants::CHECKPOINT_HEADER_SIZE;
use crate::domain::checkpoint_format::{CheckpointFormatError, CheckpointHeader, SearchCheckpoint};
use crate::domain::matcher::Match;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub(crate) fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_str(writer: &mut impl Write, s: &str) -> io::Result<()> {
    let len = u16::try_from(s.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long for checkpoint"))?;
    writer.write_u16::<LittleEndian>(len)?;
    writer.write_all(s.as_bytes())
}

fn read_str(reader: &mut impl Read) -> Result<String, CheckpointFormatError> {
    let len = reader.read_u16::<LittleEndian>().map_err(truncated)?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).map_err(truncated)?;
    String::from_utf8(buf).map_err(|_| CheckpointFormatError::Truncated("invalid UTF-8 in match record".into()))
}

fn truncated(e: io::Error) -> CheckpointFormatError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CheckpointFormatError::Truncated("unexpected end of file".into())
    } else {
        CheckpointFormatError::Io(e)
    }
}

/// Save a checkpoint atomically
pub fn save_checkpoint(
    path: impl AsRef<Path>,
    checkpoint: &SearchCheckpoint,
) -> Result<(), CheckpointFormatError> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let tmp = temp_path(path);

    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&checkpoint.header().to_bytes())?;

        for &id in &checkpoint.completed {
            writer.write_u32::<LittleEndian>(id)?;
        }

        for m in checkpoint.matches.values() {
            writer.write_u32::<LittleEndian>(m.hash)?;
            write_str(&mut writer, &m.name)?;
            write_str(&mut writer, &m.label)?;
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&tmp, path)?;
    debug!(
        "Checkpoint saved: {} shards, {} matches",
        checkpoint.completed.len(),
        checkpoint.matches.len()
    );
    Ok(())
}

/// Load a checkpoint, optionally requiring a job fingerprint and shard total
pub fn load_checkpoint(
    path: impl AsRef<Path>,
    expected_job: Option<(u64, u32)>,
) -> Result<SearchCheckpoint, CheckpointFormatError> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let mut header_buf = [0u8; CHECKPOINT_HEADER_SIZE];
    reader.read_exact(&mut header_buf).map_err(truncated)?;
    let header = CheckpointHeader::from_bytes(&header_buf)?;

    if let Some((fingerprint, total_shards)) = expected_job {
        header.validate_job(fingerprint, total_shards)?;
    }

    let mut checkpoint = SearchCheckpoint::new(header.fingerprint, header.total_shards);
    checkpoint.tested = header.tested;
    checkpoint.pruned = header.pruned;
    checkpoint.verification_failures = u64::from(header.verification_failures);
    checkpoint.skipped_records = u64::from(header.skipped_records);

    for _ in 0..header.completed_count {
        let id = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if id >= header.total_shards {
            return Err(CheckpointFormatError::Truncated(format!(
                "shard id {} out of range",
                id
            )));
        }
        checkpoint.mark_complete(id);
    }

    for _ in 0..header.match_count {
        let hash = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        let name = read_str(&mut reader)?;
        let label = read_str(&mut reader)?;
        checkpoint.add_match(Match {
            name,
            hash,
            label: Arc::from(label),
        });
    }

    Ok(checkpoint)
}

/// Remove a checkpoint file; a missing file is not an error
pub fn remove_checkpoint(path: impl AsRef<Path>) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_checkpoint() -> SearchCheckpoint {
        let mut checkpoint = SearchCheckpoint::new(0xfeed, 10);
        checkpoint.mark_complete(0);
        checkpoint.mark_complete(7);
        checkpoint.tested = 12345;
        checkpoint.pruned = 99;
        checkpoint.verification_failures = 1;
        checkpoint.skipped_records = 3;
        checkpoint.add_match(Match {
            name: "play_music".into(),
            hash: 0xdead_beef,
            label: Arc::from("Music"),
        });
        checkpoint
    }

    #[test]
    fn test_save_and_load_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ckpt.bin");
        let checkpoint = sample_checkpoint();

        save_checkpoint(&path, &checkpoint).unwrap();
        let loaded = load_checkpoint(&path, Some((0xfeed, 10))).unwrap();

        assert_eq!(loaded, checkpoint);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_job_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.bin");
        save_checkpoint(&path, &sample_checkpoint()).unwrap();

        assert!(matches!(
            load_checkpoint(&path, Some((0xbeef, 10))),
            Err(CheckpointFormatError::JobMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.bin");
        save_checkpoint(&path, &sample_checkpoint()).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(
            load_checkpoint(&path, None),
            Err(CheckpointFormatError::Truncated(_))
        ));
    }

    #[test]
    fn test_not_a_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.bin");
        fs::write(&path, vec![0u8; CHECKPOINT_HEADER_SIZE]).unwrap();
        assert!(matches!(
            load_checkpoint(&path, None),
            Err(CheckpointFormatError::InvalidMagic)
        ));
    }

    #[test]
    fn test_remove_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.bin");
        save_checkpoint(&path, &sample_checkpoint()).unwrap();
        remove_checkpoint(&path).unwrap();
        assert!(!path.exists());
        remove_checkpoint(&path).unwrap();
    }
}

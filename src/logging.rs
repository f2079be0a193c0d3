use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::config::Settings;

/// Installs the global logger.
///
/// Records go to stderr, or to `settings.log_file` when one is configured.
/// An oversized log file is emptied first.
pub fn init(settings: &Settings) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            buf.timestamp(),
            record.level(),
            record.args()
        )
    });

    let mut cleared = None;
    if let Some(path) = &settings.log_file {
        if truncate_if_oversized(path, settings.log_file_max_bytes)? {
            cleared = Some(path);
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init().map_err(io::Error::other)?;

    if let Some(path) = cleared {
        log::info!("Log file {} was cleared", path.display());
    }
    Ok(())
}

/// Empties `path` if it is larger than `max_bytes`. Returns whether it did.
pub fn truncate_if_oversized(path: &Path, max_bytes: u64) -> io::Result<bool> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if size <= max_bytes {
        return Ok(false);
    }
    File::create(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_small_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        fs::write(&path, b"short").unwrap();

        assert!(!truncate_if_oversized(&path, 1024).unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn empties_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        fs::write(&path, vec![b'x'; 2048]).unwrap();

        assert!(truncate_if_oversized(&path, 1024).unwrap());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!truncate_if_oversized(&dir.path().join("none.log"), 1).unwrap());
    }
}

use super::OutputSink;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes PNG files into a directory.
///
/// Each file is written next to its destination under a `.part` name and
/// renamed into place, so a failed write never leaves a truncated PNG behind.
pub struct PngDirectory {
    dir: PathBuf,
}

impl PngDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        fs::create_dir_all(dir).map_err(|source| Error::io(dir, source))?;
        tracing::debug!("Writing outputs to {}", dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl OutputSink for PngDirectory {
    fn write_image(&mut self, file_name: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        let partial = self.dir.join(format!("{file_name}.part"));

        let written = fs::write(&partial, png).and_then(|()| fs::rename(&partial, &path));
        if let Err(source) = written {
            // Best effort; the original error is what matters
            let _ = fs::remove_file(&partial);
            return Err(Error::io(&path, source));
        }

        Ok(path)
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_directory_and_writes_file() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("out");

        let mut sink = PngDirectory::new(&dir).unwrap();
        let path = sink.write_image("a_bg_removed.png", b"\x89PNG").unwrap();

        assert_eq!(path, dir.join("a_bg_removed.png"));
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG");
        assert!(!dir.join("a_bg_removed.png.part").exists());
        assert_eq!(sink.location(), dir.as_path());
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let temp = tempfile::tempdir().unwrap();
        let mut sink = PngDirectory::new(temp.path()).unwrap();

        // Destination is an existing non-empty directory, so the rename fails
        let blocker = temp.path().join("taken.png");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let err = sink.write_image("taken.png", b"data").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!temp.path().join("taken.png.part").exists());
    }
}

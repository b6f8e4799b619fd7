//! Local model store: finds ONNX models on disk and downloads missing ones.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("cannot create model cache {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot store model at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Called with `(bytes_so_far, content_length)`; length is 0 when unknown.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Directory pair searched for model files, cache first.
#[derive(Clone, Debug)]
pub struct ModelStore {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelStore {
    /// Store rooted at the per-user cache, `<cache>/MaskWatch/models`.
    ///
    /// macOS keeps models under Application Support instead.
    pub fn user_cache() -> Result<Self, ModelResolveError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();
        #[cfg(not(target_os = "macos"))]
        let base = dirs::cache_dir();

        let root = base.ok_or(ModelResolveError::NoCacheDir)?;
        Ok(Self::at(root.join("MaskWatch").join("models")))
    }

    pub fn at(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            bundled_dir: None,
        }
    }

    /// Adds a read-only directory checked after the cache.
    pub fn with_bundled_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundled_dir = Some(dir.into());
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Existing copy of `name`, if any.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        std::iter::once(self.cache_dir.as_path())
            .chain(self.bundled_dir.as_deref())
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Returns a local path for `name`, downloading from `url` when missing.
    pub fn fetch(
        &self,
        name: &str,
        url: &str,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = self.find(name) {
            log::debug!("Using model {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|source| ModelResolveError::CacheDir {
            path: self.cache_dir.clone(),
            source,
        })?;
        let dest = self.cache_dir.join(name);
        log::info!("Downloading {name} from {url}");
        download(url, &dest, progress)?;
        Ok(dest)
    }
}

/// Resolves `name` against the user cache, downloading on a miss.
pub fn resolve(
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    ModelStore::user_cache()?.fetch(name, url, progress)
}

/// `.part` file that is removed unless the download completes.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn for_dest(dest: &Path) -> Self {
        Self {
            path: dest.with_extension("part"),
            committed: false,
        }
    }

    fn commit(mut self, dest: &Path) -> Result<(), ModelResolveError> {
        fs::rename(&self.path, dest).map_err(|source| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Writer that reports cumulative byte counts.
struct ProgressWriter<W> {
    inner: W,
    written: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(cb) = &self.progress {
            cb(self.written, self.total);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let partial = PartialFile::for_dest(dest);
    let write_err = |source| ModelResolveError::Write {
        path: partial.path.clone(),
        source,
    };
    let file = File::create(&partial.path).map_err(write_err)?;
    let mut writer = ProgressWriter {
        inner: io::BufWriter::new(file),
        written: 0,
        total: response.content_length().unwrap_or(0),
        progress,
    };
    io::copy(&mut response, &mut writer).map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    drop(writer);

    partial.commit(dest)
}

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::MODEL_DIR_ENV;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model {name} not found; searched: {}", format_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file by name over a prioritized list of locations.
///
/// Resolution order, first existing file wins:
/// 1. `search_dirs`, in the order given
/// 2. [`default_search_dirs`] (env override, executable dir, platform share dirs)
/// 3. User cache directory
/// 4. Download from `url` into the cache, when a URL is given
pub fn resolve(
    name: &str,
    search_dirs: &[PathBuf],
    url: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let candidates = candidate_paths(name, search_dirs);
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        log::info!("Found model {name} at {}", found.display());
        return Ok(found.clone());
    }

    let Some(url) = url else {
        return Err(ModelResolveError::NotFound {
            name: name.to_string(),
            searched: candidates,
        });
    };

    let cache_dir = model_cache_dir()?;
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let cached_path = cache_dir.join(name);
    log::info!("Downloading model {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Every path [`resolve`] checks for `name`, in priority order.
pub fn candidate_paths(name: &str, search_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = search_dirs.to_vec();
    dirs.extend(default_search_dirs());
    if let Ok(cache) = model_cache_dir() {
        dirs.push(cache);
    }

    let mut paths: Vec<PathBuf> = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let path = dir.join(name);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Package-manager and platform locations tried after the configured ones.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Some(dir) = std::env::var_os(MODEL_DIR_ENV) {
        locations.push(PathBuf::from(dir));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        locations.push(exe_dir.join("models"));
    }

    #[cfg(target_os = "macos")]
    {
        // Homebrew on Apple Silicon, then Intel
        locations.push(PathBuf::from("/opt/homebrew/share/facetrack/models"));
        locations.push(PathBuf::from("/usr/local/share/facetrack/models"));
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        locations.push(PathBuf::from("/usr/local/share/facetrack/models"));
        locations.push(PathBuf::from("/usr/share/facetrack/models"));
    }
    #[cfg(target_os = "windows")]
    {
        if let Some(data) = dirs::data_dir() {
            locations.push(data.join("facetrack").join("models"));
        }
    }

    locations
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/facetrack/models/`
/// - Linux: `$XDG_CACHE_HOME/facetrack/models/` or `~/.cache/facetrack/models/`
/// - Windows: `%LOCALAPPDATA%/facetrack/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("facetrack").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("facetrack").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    let mut reader = response;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MODEL: &str = "facetrack-resolver-test-model.onnx";

    #[test]
    fn test_resolve_prefers_first_search_dir() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join(MODEL), b"first").unwrap();
        fs::write(second.join(MODEL), b"second").unwrap();

        let path = resolve(MODEL, &[first.clone(), second], None, None).unwrap();
        assert_eq!(path, first.join(MODEL));
    }

    #[test]
    fn test_resolve_skips_dirs_without_model() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join(MODEL), b"bundled model").unwrap();

        let path = resolve(MODEL, &[empty, bundled.clone()], None, None).unwrap();
        assert_eq!(path, bundled.join(MODEL));
    }

    #[test]
    fn test_resolve_without_url_reports_searched_locations() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nowhere");
        let err = resolve(MODEL, &[dir.clone()], None, None).unwrap_err();
        match err {
            ModelResolveError::NotFound { name, searched } => {
                assert_eq!(name, MODEL);
                assert_eq!(searched[0], dir.join(MODEL));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_candidate_paths_start_with_configured_dirs() {
        let dirs = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        let paths = candidate_paths(MODEL, &dirs);
        assert_eq!(paths[0], PathBuf::from("/a").join(MODEL));
        assert_eq!(paths[1], PathBuf::from("/b").join(MODEL));
        assert!(paths.len() > 2);
    }

    #[test]
    fn test_candidate_paths_are_unique() {
        let dirs = vec![PathBuf::from("/a"), PathBuf::from("/a")];
        let paths = candidate_paths(MODEL, &dirs);
        assert_eq!(paths.iter().filter(|p| p.starts_with("/a")).count(), 1);
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("facetrack"));
        assert!(path.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_download_invalid_url_returns_error() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}

// ========================================================================================
//
//                             REFERENCE DATASET DOWNLOADER
//
// ========================================================================================

use super::reference::{DatasetError, ReferenceDataset};
use crate::config::DatasetConfig;
use dwldutil::{DLFile, Downloader};
use indicatif::ProgressStyle;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ========================================================================================
//                              PUBLIC API
// ========================================================================================

/// The entry point used at startup to obtain the reference dataset.
///
/// Resolution order:
/// 1. An explicit local file (`dataset.path`) is read as-is and never downloaded.
/// 2. A cached copy `<cache_dir>/uci-<id>.data` from an earlier run is reused.
/// 3. Otherwise the file is fetched from `dataset.url` into the cache, unless
///    `dataset.offline` is set, in which case this is an error.
///
/// There are no retries; the first failure is returned.
pub fn acquire_reference_dataset(config: &DatasetConfig) -> Result<ReferenceDataset, DatasetError> {
    if let Some(path) = &config.path {
        eprintln!("> Using local reference dataset: {}", path.display());
        return ReferenceDataset::from_path(path);
    }

    let cached = cached_dataset_path(config);
    if cached.exists() {
        eprintln!(
            "> Found cached reference dataset {} at {}",
            config.id,
            cached.display()
        );
        return ReferenceDataset::from_path(&cached);
    }

    if config.offline {
        return Err(DatasetError::Download {
            id: config.id,
            url: config.url.clone(),
            reason: format!(
                "offline mode is enabled and no cached copy exists at {}",
                cached.display()
            ),
        });
    }

    download_dataset(config, &cached)
}

/// Where a downloaded copy of the configured dataset is kept.
pub fn cached_dataset_path(config: &DatasetConfig) -> PathBuf {
    config.cache_dir.join(format!("uci-{}.data", config.id))
}

// ========================================================================================
//                             PRIVATE IMPLEMENTATION
// ========================================================================================

/// Downloads the dataset and caches it at `target`. The transfer goes to a temporary
/// name first and only a file that parses as a reference dataset is moved into place,
/// so neither an interrupted transfer nor an error page ever becomes the cached copy.
fn download_dataset(
    config: &DatasetConfig,
    target: &Path,
) -> Result<ReferenceDataset, DatasetError> {
    let download_error = |reason: String| DatasetError::Download {
        id: config.id,
        url: config.url.clone(),
        reason,
    };

    fs::create_dir_all(&config.cache_dir).map_err(|source| DatasetError::Io {
        path: config.cache_dir.clone(),
        source,
    })?;

    let partial = target.with_extension("data.part");
    if partial.exists() {
        fs::remove_file(&partial).map_err(|source| DatasetError::Io {
            path: partial.clone(),
            source,
        })?;
    }

    eprintln!(
        "> Downloading reference dataset {} from {}...",
        config.id, config.url
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| download_error(format!("failed to create async runtime: {e}")))?;

    runtime.block_on(async {
        let file_to_download = DLFile::new()
            .with_url(&config.url)
            .with_path(&partial.to_string_lossy());

        // Use a progress bar style that does not require the total file size.
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map_err(|e| download_error(e.to_string()))?
            .progress_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        let configured_downloader = Downloader::new()
            .add_file(file_to_download)
            .with_style(style)
            .with_max_concurrent_downloads(1)
            .with_max_redirections(5);

        configured_downloader.start();
        Ok::<(), DatasetError>(())
    })?;

    let size = fs::metadata(&partial).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        discard_partial(&partial);
        return Err(download_error(
            "the download produced no data (network unreachable or URL invalid)".to_string(),
        ));
    }
    debug!("Downloaded {size} bytes to {}", partial.display());

    let dataset = commit_download(&partial, target)?;
    info!("Cached reference dataset {} at {}", config.id, target.display());
    Ok(dataset)
}

/// Parses a finished download and renames it to `target`. A file that does not parse
/// is deleted and its parse error returned; `target` is left untouched.
fn commit_download(partial: &Path, target: &Path) -> Result<ReferenceDataset, DatasetError> {
    let dataset = match ReferenceDataset::from_path(partial) {
        Ok(dataset) => dataset,
        Err(e) => {
            discard_partial(partial);
            return Err(e);
        }
    };
    fs::rename(partial, target).map_err(|source| DatasetError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    Ok(dataset)
}

fn discard_partial(partial: &Path) {
    if let Err(e) = fs::remove_file(partial) {
        warn!(
            "Could not remove partial download {}: {e}",
            partial.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORD: &str = "842302,M,17.99,10.38,122.8,1001,0.1184,0.2776,0.3001,0.1471,0.2419,0.07871,1.095,0.9053,8.589,153.4,0.006399,0.04904,0.05373,0.01587,0.03003,0.006193,25.38,17.33,184.6,2019,0.1622,0.6656,0.7119,0.2654,0.4601,0.1189";

    fn offline_config(cache_dir: &Path) -> DatasetConfig {
        DatasetConfig {
            cache_dir: cache_dir.to_path_buf(),
            offline: true,
            ..DatasetConfig::default()
        }
    }

    #[test]
    fn cache_path_is_keyed_by_dataset_id() {
        let config = offline_config(Path::new("/tmp/cache"));
        assert_eq!(
            cached_dataset_path(&config),
            PathBuf::from("/tmp/cache/uci-17.data")
        );
    }

    #[test]
    fn cached_copy_is_reused_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        let mut file = fs::File::create(cached_dataset_path(&config)).unwrap();
        writeln!(file, "{RECORD}").unwrap();

        let dataset = acquire_reference_dataset(&config).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn offline_without_cache_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        match acquire_reference_dataset(&config) {
            Err(DatasetError::Download { id, reason, .. }) => {
                assert_eq!(id, 17);
                assert!(reason.contains("offline"), "{reason}");
            }
            other => panic!("expected Download error, got {other:?}"),
        }
    }

    #[test]
    fn explicit_path_wins_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.data");
        fs::write(&local, format!("{RECORD}\n{RECORD}\n")).unwrap();
        let config = DatasetConfig {
            path: Some(local),
            ..offline_config(dir.path())
        };
        assert_eq!(acquire_reference_dataset(&config).unwrap().len(), 2);
    }

    #[test]
    fn valid_download_is_moved_into_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        let target = cached_dataset_path(&config);
        let partial = target.with_extension("data.part");
        fs::write(&partial, format!("{RECORD}\n")).unwrap();

        let dataset = commit_download(&partial, &target).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.ids(), ["842302".to_string()]);
        assert!(target.exists());
        assert!(!partial.exists());

        // Later runs read the committed copy.
        assert_eq!(acquire_reference_dataset(&config).unwrap().len(), 1);
    }

    #[test]
    fn error_page_download_never_reaches_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        let target = cached_dataset_path(&config);
        let partial = target.with_extension("data.part");
        fs::write(&partial, "<html>404 Not Found</html>").unwrap();

        assert!(matches!(
            commit_download(&partial, &target),
            Err(DatasetError::Malformed { record: 1, .. })
        ));
        assert!(!target.exists());
        assert!(!partial.exists());

        // Nothing was cached, so the next run still reports a missing dataset rather
        // than the same parse failure.
        assert!(matches!(
            acquire_reference_dataset(&config),
            Err(DatasetError::Download { .. })
        ));
    }

    #[test]
    fn truncated_download_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("uci-17.data");
        let partial = target.with_extension("data.part");
        let cut = &RECORD[..RECORD.len() / 2];
        fs::write(&partial, format!("{RECORD}\n{cut}")).unwrap();

        assert!(commit_download(&partial, &target).is_err());
        assert!(!target.exists());
        assert!(!partial.exists());
    }
}

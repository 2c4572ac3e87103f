//! Start-up check for external resources.

use std::path::{Path, PathBuf};

use crate::config::PathConfig;
use crate::fs::FileSystem;

/// How a resource is located on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    /// The configured path must exist as given.
    File,
    /// A bare program name is searched for in `PATH`; a path is used as is.
    Program,
}

/// One thing the application needs before it can download anything.
#[derive(Debug, Clone)]
struct Resource {
    name: String,
    path: PathBuf,
    hint: &'static str,
    lookup: Lookup,
}

fn required_resources(paths: &PathConfig) -> Vec<Resource> {
    let mut resources = vec![
        Resource {
            name: "Cookie file".to_string(),
            path: paths.cookie_file.clone(),
            hint: "Please export your browser cookies (Netscape format) to this path.",
            lookup: Lookup::File,
        },
        Resource {
            name: "ffmpeg".to_string(),
            path: paths.ffmpeg.clone(),
            hint: "Install ffmpeg or set paths.ffmpeg in the config file.",
            lookup: Lookup::Program,
        },
        Resource {
            name: "yt-dlp".to_string(),
            path: paths.yt_dlp.clone(),
            hint: "Install yt-dlp or set paths.yt_dlp in the config file.",
            lookup: Lookup::Program,
        },
    ];

    resources.extend(paths.assets.iter().map(|asset| Resource {
        name: asset
            .file_name()
            .map_or_else(|| asset.display().to_string(), |n| n.to_string_lossy().into_owned()),
        path: asset.clone(),
        hint: "Please restore the missing asset next to the program.",
        lookup: Lookup::File,
    }));

    resources
}

/// Checks every required resource and describes the missing ones.
///
/// Returns an empty list when everything is in place.
pub async fn check<F: FileSystem>(paths: &PathConfig, fs: &F) -> Vec<String> {
    let search_path: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();
    check_with_search_path(paths, fs, &search_path).await
}

async fn check_with_search_path<F: FileSystem>(
    paths: &PathConfig,
    fs: &F,
    search_path: &[PathBuf],
) -> Vec<String> {
    let mut problems = Vec::new();
    for resource in required_resources(paths) {
        if !is_present(&resource, fs, search_path).await {
            problems.push(format!(
                "{} not found: {}\n{}",
                resource.name,
                resource.path.display(),
                resource.hint
            ));
        }
    }
    problems
}

async fn is_present<F: FileSystem>(resource: &Resource, fs: &F, search_path: &[PathBuf]) -> bool {
    if resource.lookup == Lookup::File || !is_bare_name(&resource.path) {
        return fs.exists(&resource.path).await;
    }

    for dir in search_path {
        for candidate in program_candidates(dir, &resource.path) {
            if fs.exists(&candidate).await {
                return true;
            }
        }
    }
    false
}

fn is_bare_name(path: &Path) -> bool {
    path.components().count() == 1 && !path.is_absolute()
}

fn program_candidates(dir: &Path, name: &Path) -> Vec<PathBuf> {
    let plain = dir.join(name);
    if cfg!(target_os = "windows") && name.extension().is_none() {
        vec![plain.with_extension("exe"), plain]
    } else {
        vec![plain]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// A mock file system that only knows which paths exist.
    struct MockFileSystem {
        present: Mutex<HashSet<PathBuf>>,
    }

    impl MockFileSystem {
        fn with(paths: &[&str]) -> Self {
            Self {
                present: Mutex::new(paths.iter().map(PathBuf::from).collect()),
            }
        }
    }

    #[async_trait]
    impl FileSystem for MockFileSystem {
        async fn exists(&self, path: &Path) -> bool {
            self.present.lock().unwrap().contains(path)
        }

        async fn create_dir_all(&self, _path: &Path) -> std::io::Result<()> {
            Ok(())
        }

        async fn list_files(&self, _dir: &Path) -> std::io::Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }

        async fn remove_file(&self, _path: &Path) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn paths() -> PathConfig {
        PathConfig {
            download_dir: PathBuf::from("/dl"),
            cookie_file: PathBuf::from("/cfg/cookies.txt"),
            ffmpeg: PathBuf::from("/opt/ffmpeg"),
            yt_dlp: PathBuf::from("yt-dlp"),
            assets: vec![PathBuf::from("/res/logo.png")],
        }
    }

    #[tokio::test]
    async fn everything_present() {
        let fs = MockFileSystem::with(&[
            "/cfg/cookies.txt",
            "/opt/ffmpeg",
            "/usr/bin/yt-dlp",
            "/res/logo.png",
        ]);
        let search = vec![PathBuf::from("/usr/local/bin"), PathBuf::from("/usr/bin")];
        assert!(check_with_search_path(&paths(), &fs, &search).await.is_empty());
    }

    #[tokio::test]
    async fn reports_each_missing_resource() {
        let fs = MockFileSystem::with(&["/opt/ffmpeg"]);
        let problems = check_with_search_path(&paths(), &fs, &[PathBuf::from("/usr/bin")]).await;

        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("Cookie file not found: /cfg/cookies.txt"));
        assert!(problems[0].contains("export your browser cookies"));
        assert!(problems[1].starts_with("yt-dlp not found"));
        assert!(problems[2].starts_with("logo.png not found"));
    }

    #[tokio::test]
    async fn bare_program_is_not_looked_up_in_cwd() {
        let fs = MockFileSystem::with(&["/cfg/cookies.txt", "/opt/ffmpeg", "/res/logo.png", "yt-dlp"]);
        let problems = check_with_search_path(&paths(), &fs, &[]).await;
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("yt-dlp not found"));
    }

    #[test]
    fn bare_name_detection() {
        assert!(is_bare_name(Path::new("ffmpeg")));
        assert!(!is_bare_name(Path::new("./ffmpeg")));
        assert!(!is_bare_name(Path::new("/usr/bin/ffmpeg")));
        assert!(!is_bare_name(Path::new("bin/ffmpeg")));
    }
}

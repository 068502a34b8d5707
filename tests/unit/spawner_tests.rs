//! Unit tests for tool invocation arguments and environment.

use std::ffi::OsString;
use std::path::PathBuf;

use issue_search::tool::spawner::{augmented_path, SpawnConfig, FALLBACK_PATH_DIRS};

#[test]
fn args_without_home_dir() {
    let config = SpawnConfig {
        executable: PathBuf::from("/opt/tool"),
        home_dir: None,
    };
    assert_eq!(config.args(), vec![OsString::from("mcp")]);
}

#[test]
fn args_with_home_dir() {
    let config = SpawnConfig {
        executable: PathBuf::from("/opt/tool"),
        home_dir: Some(PathBuf::from("/data/tool home")),
    };
    assert_eq!(
        config.args(),
        vec![
            OsString::from("mcp"),
            OsString::from("-m"),
            OsString::from("/data/tool home"),
        ]
    );
}

#[cfg(unix)]
#[test]
fn missing_path_gets_every_fallback_dir() {
    let path = augmented_path(None);
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
    let expected: Vec<PathBuf> = FALLBACK_PATH_DIRS.iter().map(PathBuf::from).collect();
    assert_eq!(dirs, expected);
}

#[cfg(unix)]
#[test]
fn inherited_entries_come_first_and_are_not_duplicated() {
    let inherited = OsString::from("/home/me/bin:/usr/bin");
    let path = augmented_path(Some(inherited.as_os_str()));
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();

    assert_eq!(dirs[0], PathBuf::from("/home/me/bin"));
    assert_eq!(dirs[1], PathBuf::from("/usr/bin"));
    assert_eq!(
        dirs.iter().filter(|d| *d == &PathBuf::from("/usr/bin")).count(),
        1,
        "existing entries must not be repeated"
    );
    for fallback in FALLBACK_PATH_DIRS {
        assert!(dirs.contains(&PathBuf::from(fallback)), "missing {fallback}");
    }
}

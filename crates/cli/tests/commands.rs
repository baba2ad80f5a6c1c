//! End-to-end tests for the folio binary

mod common;

use anyhow::Result;
use common::FolioEnv;

#[test]
fn test_favorite_lifecycle() -> Result<()> {
    let env = FolioEnv::new()?;
    let photos = env.folder("photos", &["a.jpg", "b.png"])?;
    let photos_arg = photos.display().to_string();

    folio!(env, "favorite", "add", &photos_arg, "--name", "Holiday", "--max-items", "5", "--sort", "name-asc")
        .assert_success()?;
    assert!(env.data_dir().join("folders.toml").exists());

    let list = folio!(env, "favorite", "list").assert_success()?;
    assert!(list.contains_stdout("Holiday"));
    assert!(list.contains_stdout("name-asc"));

    folio!(env, "favorite", "remove", &photos_arg).assert_success()?;
    let list = folio!(env, "favorite", "list").assert_success()?;
    assert!(list.contains_stdout("No favorite folders"));

    // Removing twice fails
    folio!(env, "favorite", "remove", &photos_arg).assert_failure()?;
    Ok(())
}

#[test]
fn test_refresh_then_show() -> Result<()> {
    let env = FolioEnv::new()?;
    let docs = env.folder("docs", &["c.txt", "a.txt", "b.jpg", ".hidden"])?;
    let docs_arg = docs.display().to_string();

    folio!(env, "source", "add", &docs_arg, "--sort", "name-asc").assert_success()?;
    let refresh = folio!(env, "refresh", &docs_arg).assert_success()?;
    assert!(refresh.contains_stdout("3 items"));

    let show = folio!(env, "show", &docs_arg, "--json").assert_success()?;
    let listing: serde_json::Value = serde_json::from_str(&show.stdout)?;
    let names: Vec<&str> = listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["a.txt", "b.jpg", "c.txt"]);
    assert_eq!(listing["items"][1]["is_image"], true);
    assert_eq!(listing["cache_type"], "standard");

    let limited = folio!(env, "show", &docs_arg, "--limit", "1").assert_success()?;
    assert!(limited.contains_stdout("a.txt"));
    assert!(!limited.contains_stdout("c.txt"));
    Ok(())
}

#[test]
fn test_show_without_cache_fails() -> Result<()> {
    let env = FolioEnv::new()?;
    let empty = env.folder("empty", &[])?;

    let result = folio!(env, "show", &empty.display().to_string()).assert_failure()?;
    assert!(result.contains_stderr("No cached listing"));
    Ok(())
}

#[test]
fn test_status_reports_stopped_daemon() -> Result<()> {
    let env = FolioEnv::new()?;
    let music = env.folder("music", &["song.mp3"])?;
    folio!(env, "favorite", "add", &music.display().to_string()).assert_success()?;

    let status = folio!(env, "status").assert_success()?;
    assert!(status.contains_stdout("stopped"));
    assert!(status.contains_stdout("Watched folders: 1"));
    assert!(status.contains_stdout("not cached"));
    Ok(())
}

#[test]
fn test_config_set_get_and_validation() -> Result<()> {
    let env = FolioEnv::new()?;

    folio!(env, "config", "set", "watcher.debounce_ms", "300").assert_success()?;
    let value = folio!(env, "config", "get", "watcher.debounce_ms").assert_success()?;
    assert_eq!(value.stdout.trim(), "300");
    assert!(env.config_path().exists());

    folio!(env, "config", "set", "refresh.max_concurrency", "99").assert_failure()?;
    folio!(env, "config", "get", "no.such.key").assert_failure()?;

    let list = folio!(env, "config", "list").assert_success()?;
    assert!(list.contains_stdout("[watcher]"));
    assert!(list.contains_stdout("watcher.debounce_ms = 300"));
    Ok(())
}

#[test]
fn test_invalid_sort_is_rejected() -> Result<()> {
    let env = FolioEnv::new()?;
    let dir = env.folder("x", &[])?;

    let result = folio!(env, "favorite", "add", &dir.display().to_string(), "--sort", "shuffle").assert_failure()?;
    assert!(result.contains_stderr("folio sorts"));

    let sorts = folio!(env, "sorts").assert_success()?;
    assert!(sorts.contains_stdout("modified-newest"));
    assert!(sorts.contains_stdout("added-oldest"));
    Ok(())
}

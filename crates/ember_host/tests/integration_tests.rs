//! End-to-end tests of the mod host driving real mods.
//!
//! These cover the full path from registration through `init`, input
//! dispatch, named events and unload, using the bundled `cpp_hell` mod
//! alongside small closure-based mods. The library tests load the
//! `hell_mod` cdylib from the current build and are skipped when it has not
//! been built.

use ember_host::{
    create_mod_manager, HostConfig, HostError, ModManager, ModOrigin, ScrollDelta, ZoomPolicy,
};
use ember_mod_api::{
    ClosureMod, EventData, GameMod, HandlerTable, KeyCode, LogLevel, ModError, ModStr, Position,
};
use hell_mod::HellMod;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Shared record of callbacks a recording mod saw.
type Seen = Arc<Mutex<Vec<String>>>;

fn host_with_hell() -> ModManager {
    let mut manager = create_mod_manager(HostConfig::default());
    manager
        .register(Box::new(HellMod::new()))
        .expect("cpp_hell registers");
    manager
}

/// The `hell_mod` cdylib produced by the same build, if there is one.
fn built_hell_library() -> Option<PathBuf> {
    let file = format!("{}hell_mod{}", DLL_PREFIX, DLL_SUFFIX);

    // Test binaries live in `<target>/<profile>/deps`.
    let mut dirs = Vec::new();
    if let Some(deps) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if let Some(profile) = deps.parent() {
            dirs.push(profile.to_path_buf());
        }
        dirs.push(deps);
    }
    dirs.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../target/debug"));

    dirs.into_iter()
        .map(|dir| dir.join(&file))
        .find(|path| path.is_file())
}

/// Copies the built library into `dir` so each test opens its own image.
fn staged_hell_library(dir: &Path) -> Option<PathBuf> {
    let Some(built) = built_hell_library() else {
        eprintln!("skipping: hell_mod library not built (run `cargo build -p hell_mod`)");
        return None;
    };
    let staged = dir.join(built.file_name()?);
    std::fs::copy(&built, &staged).expect("copy hell_mod library");
    Some(staged)
}

fn recorder(name: &'static str, seen: Seen) -> Box<dyn GameMod> {
    let on_key = seen.clone();
    let on_event = seen.clone();
    let on_shutdown = seen;
    Box::new(ClosureMod::new(
        name,
        "0.1.0",
        HandlerTable::new()
            .on_key_event(move |_, key| {
                on_key.lock().unwrap().push(format!("{name}:key:{}", key.raw()));
                Ok(())
            })
            .on_event(move |_, _, data| {
                on_event.lock().unwrap().push(format!("{name}:event:{data:?}"));
                Ok(())
            })
            .on_shutdown(move |_| {
                on_shutdown.lock().unwrap().push(format!("{name}:shutdown"));
                Ok(())
            }),
    ))
}

#[test]
fn hell_mod_end_to_end() {
    let mut manager = host_with_hell();

    let entry = manager.state().last_log().expect("init logged a greeting");
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.module, "cpp_hell");
    assert_eq!(entry.module.len(), 8);
    assert_eq!(entry.message, "Hello from hell");
    assert_eq!(entry.message.len(), 15);

    assert_eq!(manager.zoom(), 1.0);
    manager.scroll(2.5);
    assert_eq!(manager.zoom(), 3.5);
}

#[test]
fn scroll_deltas_accumulate() {
    let mut manager = host_with_hell();

    manager.scroll(1.5);
    manager.scroll(-0.5);
    assert_eq!(manager.zoom(), 2.0);

    manager.scroll_input(ScrollDelta::Pixels(4.0));
    assert_eq!(manager.zoom(), -2.0);
}

#[test]
fn non_scroll_callbacks_change_nothing() {
    let mut manager = host_with_hell();
    let log_before = manager.state().log().count();

    manager.update(0.016);
    manager.key_event(65u32);
    manager.emit_event("anything", EventData::from("ignored"));
    manager.update(0.016);

    assert_eq!(manager.zoom(), 1.0);
    assert_eq!(manager.state().log().count(), log_before);
}

#[test]
fn zoom_is_unbounded_by_default() {
    let mut manager = host_with_hell();
    manager.scroll(-5.0);
    assert_eq!(manager.zoom(), -4.0);
}

#[test]
fn clamped_policy_bounds_mod_writes() {
    let mut manager = create_mod_manager(HostConfig {
        zoom_policy: ZoomPolicy::clamped(0.25, 4.0).unwrap(),
        ..HostConfig::default()
    });
    manager.register(Box::new(HellMod::new())).unwrap();

    manager.scroll(10.0);
    assert_eq!(manager.zoom(), 4.0);
    manager.scroll(-10.0);
    assert_eq!(manager.zoom(), 0.25);
}

#[test]
fn events_reach_other_subscribers_in_order() {
    let seen: Seen = Arc::default();
    let mut manager = create_mod_manager(HostConfig::default());

    let sender = ClosureMod::new(
        "sender",
        "0.1.0",
        HandlerTable::new()
            .on_init(|host| {
                host.subscribe_event(ModStr::new("chat"));
                Ok(())
            })
            .on_key_event(|host, key| {
                let chat = host.subscribe_event(ModStr::new("chat"));
                host.send_event(chat, EventData::I32(key.raw() as i32));
                Ok(())
            })
            .on_event(|_, _, _| Err(ModError::failed("sender must not hear itself"))),
    );
    manager.register(Box::new(sender)).unwrap();

    let listener = recorder("listener", seen.clone());
    manager.register(listener).unwrap();
    manager
        .register(Box::new(ClosureMod::new(
            "subscriber",
            "0.1.0",
            HandlerTable::new().on_init(|host| {
                host.subscribe_event(ModStr::new("chat"));
                Ok(())
            }),
        )))
        .unwrap();
    // Subscribe the listener from the host side.
    let listener_handle = manager.find_by_name("listener").unwrap();
    let chat = manager.state().events.handle_for("chat").unwrap();
    manager
        .state_mut()
        .events
        .subscribe_by_handle(chat, listener_handle)
        .unwrap();

    // Each key makes the sender emit one chat event.
    manager.key_event(1u32);
    manager.key_event(2u32);
    seen.lock().unwrap().clear();

    let summary = manager.update(0.016);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "listener:event:I32(1)".to_string(),
            "listener:event:I32(2)".to_string(),
        ]
    );
}

#[test]
fn host_events_are_delivered_on_update() {
    let seen: Seen = Arc::default();
    let mut manager = create_mod_manager(HostConfig::default());
    let handle = manager.register(recorder("watcher", seen.clone())).unwrap();
    manager
        .state_mut()
        .events
        .subscribe_by_name("pause", handle);

    assert_eq!(manager.emit_event("pause", EventData::None), 1);
    assert!(seen.lock().unwrap().is_empty());

    manager.update(0.016);
    assert_eq!(*seen.lock().unwrap(), vec!["watcher:event:None".to_string()]);
}

#[test]
fn key_subscriptions_filter_delivery() {
    let seen: Seen = Arc::default();
    let mut manager = create_mod_manager(HostConfig::default());

    manager.register(recorder("everything", seen.clone())).unwrap();
    let on_key = seen.clone();
    manager
        .register(Box::new(ClosureMod::new(
            "space_only",
            "0.1.0",
            HandlerTable::new()
                .on_init(|host| {
                    host.subscribe_key(KeyCode(32));
                    Ok(())
                })
                .on_key_event(move |_, key| {
                    on_key
                        .lock()
                        .unwrap()
                        .push(format!("space_only:key:{}", key.raw()));
                    Ok(())
                }),
        )))
        .unwrap();

    assert_eq!(manager.key_event(65u32).delivered, 1);
    assert_eq!(manager.key_event(32u32).delivered, 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "everything:key:65".to_string(),
            "everything:key:32".to_string(),
            "space_only:key:32".to_string(),
        ]
    );
}

#[test]
fn failing_and_panicking_mods_do_not_stop_dispatch() {
    let mut manager = host_with_hell();
    manager
        .register(Box::new(ClosureMod::new(
            "grumpy",
            "0.1.0",
            HandlerTable::new().on_scroll(|_, _| Err(ModError::failed("no"))),
        )))
        .unwrap();
    manager
        .register(Box::new(ClosureMod::new(
            "explosive",
            "0.1.0",
            HandlerTable::new().on_scroll(|_, _| panic!("kaboom")),
        )))
        .unwrap();

    let summary = manager.scroll(1.0);
    assert_eq!(summary.delivered, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(manager.zoom(), 2.0);

    let stats = manager.stats();
    assert_eq!(stats.loaded_mods, 3);
    assert_eq!(stats.total_failures, 2);
    assert_eq!(stats.total_panics, 1);
}

#[test]
fn duplicate_names_are_rejected() {
    let mut manager = host_with_hell();
    let err = manager.register(Box::new(HellMod::new())).unwrap_err();
    assert!(matches!(err, HostError::AlreadyLoaded(ref name) if name == "cpp_hell"));
    assert_eq!(manager.mod_count(), 1);
}

#[test]
fn unload_calls_shutdown_and_forgets_the_mod() {
    let seen: Seen = Arc::default();
    let mut manager = create_mod_manager(HostConfig::default());
    let handle = manager.register(recorder("leaving", seen.clone())).unwrap();
    manager.state_mut().events.subscribe_by_name("news", handle);

    manager.unload(handle).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["leaving:shutdown".to_string()]);
    assert!(manager.mod_info(handle).is_none());
    assert_eq!(manager.emit_event("news", EventData::None), 0);
    assert!(matches!(
        manager.unload(handle),
        Err(HostError::NotFound(h)) if h == handle
    ));
}

#[test]
fn shutdown_all_runs_newest_first() {
    let seen: Seen = Arc::default();
    let mut manager = create_mod_manager(HostConfig::default());
    manager.register(recorder("first", seen.clone())).unwrap();
    manager.register(recorder("second", seen.clone())).unwrap();

    manager.shutdown_all();
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["second:shutdown".to_string(), "first:shutdown".to_string()]
    );
    assert_eq!(manager.mod_count(), 0);
}

#[test]
fn loaded_mods_report_origin() {
    let manager = host_with_hell();
    let mods = manager.loaded_mods();
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].name, "cpp_hell");
    assert_eq!(mods[0].origin, ModOrigin::Builtin);
    assert_eq!(mods[0].stats.calls, 1);
}

#[tokio::test]
async fn load_all_mods_with_whitelist_skips_others() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("libcpp_hell.so"), b"not really a library").unwrap();
    std::fs::write(dir.path().join("libother.so"), b"not really a library").unwrap();

    let mut manager = create_mod_manager(HostConfig {
        mod_directory: dir.path().to_path_buf(),
        whitelist: vec!["other_mod".to_string()],
        ..HostConfig::default()
    });

    let discovered = manager.discover_mods().await.unwrap();
    assert_eq!(discovered.len(), 2);

    // Nothing is whitelisted, so nothing is even attempted.
    assert!(manager.load_all_mods().await.unwrap().is_empty());
    assert_eq!(manager.mod_count(), 0);
}

#[test]
fn load_library_reports_bad_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("libbroken.so");
    std::fs::write(&path, b"garbage").unwrap();

    let mut manager = create_mod_manager(HostConfig::default());
    assert!(matches!(
        manager.load_library(&path),
        Err(HostError::LoadFailed { .. })
    ));
    assert_eq!(manager.mod_count(), 0);
}

#[test]
fn library_mod_loads_reloads_and_unloads() {
    let dir = TempDir::new().unwrap();
    let Some(path) = staged_hell_library(dir.path()) else {
        return;
    };
    let mut manager = create_mod_manager(HostConfig::default());

    let handle = manager.load_library(&path).expect("hell_mod library loads");
    let entry = manager.state().last_log().unwrap();
    assert_eq!(entry.module, "cpp_hell");
    assert_eq!(entry.module.len(), 8);
    assert_eq!(entry.message, "Hello from hell");
    assert_eq!(entry.message.len(), 15);

    let info = manager.mod_info(handle).unwrap();
    assert_eq!(info.origin, ModOrigin::Library(path.clone()));
    assert_eq!(manager.stats().library_mods, 1);

    manager.scroll(2.5);
    assert_eq!(manager.zoom(), 3.5);

    // Reload keeps the handle and runs init again; zoom lives in the host.
    manager.reload(handle).unwrap();
    assert_eq!(manager.find_by_name("cpp_hell"), Some(handle));
    assert_eq!(manager.state().log().count(), 2);
    manager.scroll(1.0);
    assert_eq!(manager.zoom(), 4.5);

    assert_eq!(manager.reload_all(), vec![handle]);
    assert_eq!(manager.state().log().count(), 3);
    assert_eq!(manager.mod_info(handle).unwrap().origin, ModOrigin::Library(path));

    manager.unload(handle).unwrap();
    assert_eq!(manager.mod_count(), 0);
    assert!(matches!(manager.reload(handle), Err(HostError::NotFound(_))));
}

#[tokio::test]
async fn load_all_mods_loads_whitelisted_library_once() {
    let dir = TempDir::new().unwrap();
    let Some(path) = staged_hell_library(dir.path()) else {
        return;
    };
    let mut manager = create_mod_manager(HostConfig {
        mod_directory: dir.path().to_path_buf(),
        whitelist: vec!["hell_mod".to_string()],
        ..HostConfig::default()
    });

    let loaded = manager.load_all_mods().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(manager.find_by_name("cpp_hell"), Some(loaded[0]));

    let discovered = manager.discover_mods().await.unwrap();
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].path, path);
    assert!(discovered[0].is_loaded);

    // Already loaded libraries are skipped on the next pass.
    assert!(manager.load_all_mods().await.unwrap().is_empty());
    assert_eq!(manager.mod_count(), 1);
}

#[test]
fn mods_steer_the_camera_from_held_keys_and_mouse() {
    const RIGHT: KeyCode = KeyCode(262);
    let mut manager = create_mod_manager(HostConfig::default());
    manager
        .register(Box::new(ClosureMod::new(
            "pan",
            "0.1.0",
            HandlerTable::new().on_update(|host| {
                if host.key_pressed(RIGHT) {
                    host.move_camera(Position::new(10.0 * host.delta_time(), 0.0));
                }
                if host.mouse_position() == Position::ORIGIN {
                    host.set_camera_position(Position::ORIGIN);
                }
                Ok(())
            }),
        )))
        .unwrap();

    manager.state_mut().set_mouse_position(Position::new(5.0, 5.0));
    manager.update(0.5);
    assert_eq!(manager.state().camera.position(), Position::ORIGIN);

    manager.press_key(RIGHT);
    manager.update(0.5);
    manager.update(0.5);
    assert_eq!(manager.state().camera.position(), Position::new(10.0, 0.0));

    manager.release_key(RIGHT);
    manager.update(0.5);
    assert_eq!(manager.state().camera.position(), Position::new(10.0, 0.0));

    // Mouse at the origin makes the mod recentre.
    manager.state_mut().set_mouse_position(Position::ORIGIN);
    manager.update(0.5);
    assert_eq!(manager.state().camera.position(), Position::ORIGIN);
    assert_eq!(manager.zoom(), 1.0);
}

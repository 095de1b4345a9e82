//! TDD Tests for the workspace lookup
//!
//! Folder scans, file events and folder removal against an in-memory tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use omt_core::{MemoryFileSystem, RegistryError};

use crate::config::WorkspaceSettings;
use crate::workspace::WorkspaceLookup;

fn lookup_with(fs: MemoryFileSystem) -> (WorkspaceLookup, Arc<MemoryFileSystem>) {
    lookup_with_settings(fs, WorkspaceSettings::default())
}

fn lookup_with_settings(
    fs: MemoryFileSystem,
    settings: WorkspaceSettings,
) -> (WorkspaceLookup, Arc<MemoryFileSystem>) {
    let fs = Arc::new(fs);
    let lookup = WorkspaceLookup::new(fs.clone(), settings);
    (lookup, fs)
}

fn two_folder_tree() -> MemoryFileSystem {
    MemoryFileSystem::new()
        .with_file("/one/a.omt", "moduleName: A\n")
        .with_file("/one/sub/b.omt", "moduleName: B # second\n")
        .with_file("/one/plain.omt", "model: {}\n")
        .with_file("/two/c.omt", "moduleName: C\n")
}

// ==================== FOLDER SCAN TESTS ====================

mod scan_tests {
    use super::*;

    /// Test 1: Scanning a folder registers its declared modules
    #[tokio::test]
    async fn test_scan_registers_modules() {
        let (lookup, _) = lookup_with(two_folder_tree());

        let found = lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();

        assert_eq!(found, 2);
        assert_eq!(lookup.module_path("A").await, Some(PathBuf::from("/one/a.omt")));
        assert_eq!(lookup.module_path("B").await, Some(PathBuf::from("/one/sub/b.omt")));
        assert_eq!(lookup.module_path("C").await, None);
    }

    /// Test 2: Adding the same folder twice is rejected
    #[tokio::test]
    async fn test_duplicate_folder_rejected() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap();

        let err = lookup.add_folder(Path::new("/one")).await.unwrap_err();

        assert_eq!(err, RegistryError::DuplicateFolder(PathBuf::from("/one")));
    }

    /// Test 3: Removing a folder that was never added is rejected
    #[tokio::test]
    async fn test_unknown_folder_rejected() {
        let (lookup, _) = lookup_with(two_folder_tree());

        let err = lookup.remove_folder(Path::new("/nowhere")).await.unwrap_err();

        assert_eq!(err, RegistryError::UnknownFolder(PathBuf::from("/nowhere")));
    }

    /// Test 4: Add then remove leaves other folders' modules in place
    #[tokio::test]
    async fn test_folder_round_trip() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();
        lookup.add_folder(Path::new("/two")).await.unwrap().await.unwrap();
        assert_eq!(lookup.module_count().await, 3);

        lookup.remove_folder(Path::new("/one")).await.unwrap();

        assert_eq!(lookup.module_count().await, 1);
        assert!(lookup.module_path("C").await.is_some());
    }

    /// Test 5: Ignored directories are not scanned
    #[tokio::test]
    async fn test_scan_skips_ignored_components() {
        let fs = two_folder_tree().with_file("/one/node_modules/pkg/x.omt", "moduleName: X\n");
        let (lookup, _) = lookup_with(fs);

        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();

        assert!(lookup.module_path("X").await.is_none());
    }

    /// Test 6: Alias configs are discovered by the scan
    #[tokio::test]
    async fn test_scan_discovers_alias_configs() {
        let fs = two_folder_tree().with_file(
            "/one/tsconfig.json",
            r#"{"compilerOptions":{"paths":{"@one/*":["./*"]}}}"#,
        );
        let (lookup, _) = lookup_with(fs);

        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();

        let aliases = lookup.aliases();
        assert_eq!(aliases.read().await.len(), 1);
    }
}

// ==================== FILE EVENT TESTS ====================

mod event_tests {
    use super::*;

    /// Test 7: Changed text renames the module
    #[tokio::test]
    async fn test_change_with_text_renames_module() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();

        lookup
            .file_changed(Path::new("/one/a.omt"), Some("moduleName: Renamed\n"))
            .await;

        assert!(lookup.module_path("A").await.is_none());
        assert_eq!(lookup.module_path("Renamed").await, Some(PathBuf::from("/one/a.omt")));
    }

    /// Test 8: Created files are read from disk
    #[tokio::test]
    async fn test_created_file_is_read() {
        let (lookup, fs) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();
        fs.insert("/one/new.omt", "moduleName: Fresh\n");

        lookup.file_changed(Path::new("/one/new.omt"), None).await;

        assert_eq!(lookup.module_path("Fresh").await, Some(PathBuf::from("/one/new.omt")));
    }

    /// Test 9: Same name in another file, last write wins
    #[tokio::test]
    async fn test_conflicting_name_last_write_wins() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();
        lookup.add_folder(Path::new("/two")).await.unwrap().await.unwrap();

        lookup
            .file_changed(Path::new("/two/c.omt"), Some("moduleName: A\n"))
            .await;

        assert_eq!(lookup.module_path("A").await, Some(PathBuf::from("/two/c.omt")));
        assert_eq!(lookup.module_count().await, 2);
        assert!(lookup.module_path("C").await.is_none());
    }

    /// Test 10: Deleted files drop their module
    #[tokio::test]
    async fn test_deleted_file_drops_module() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();

        lookup.file_deleted(Path::new("/one/a.omt")).await;

        assert!(lookup.module_path("A").await.is_none());
        assert!(lookup.module_path("B").await.is_some());
    }

    /// Test 11: Unreadable files are skipped without touching the registry
    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let (lookup, _) = lookup_with(two_folder_tree());

        lookup.file_changed(Path::new("/one/missing.omt"), None).await;

        assert_eq!(lookup.module_count().await, 0);
    }

    /// Test 12: Changed alias configs are tracked, deleted ones forgotten
    #[tokio::test]
    async fn test_alias_config_events() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();
        let config = Path::new("/one/tsconfig.json");

        lookup.file_changed(config, None).await;
        assert_eq!(lookup.aliases().read().await.len(), 1);

        lookup.file_deleted(config).await;
        assert!(lookup.aliases().read().await.is_empty());
    }

    /// Test 13: Events for other file types are ignored
    #[tokio::test]
    async fn test_other_files_ignored() {
        let (lookup, _) = lookup_with(two_folder_tree());

        lookup
            .file_changed(Path::new("/one/readme.md"), Some("moduleName: Nope\n"))
            .await;

        assert_eq!(lookup.module_count().await, 0);
    }

    /// Test 14: Events outside the configured module glob are ignored
    #[tokio::test]
    async fn test_events_respect_module_glob() {
        let fs = MemoryFileSystem::new()
            .with_file("/one/models/a.omt", "moduleName: A\n")
            .with_file("/one/scratch/x.omt", "moduleName: X\n");
        let settings = WorkspaceSettings {
            module_glob: "models/**/*.omt".to_string(),
            ..WorkspaceSettings::default()
        };
        let (lookup, fs) = lookup_with_settings(fs, settings);
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();
        assert!(lookup.module_path("X").await.is_none());

        lookup.file_changed(Path::new("/one/scratch/x.omt"), None).await;
        assert!(lookup.module_path("X").await.is_none());

        fs.insert("/one/models/deep/b.omt", "moduleName: B\n");
        lookup.file_changed(Path::new("/one/models/deep/b.omt"), None).await;
        assert_eq!(
            lookup.module_path("B").await,
            Some(PathBuf::from("/one/models/deep/b.omt"))
        );
    }

    /// Test 15: Files outside every registered folder are ignored
    #[tokio::test]
    async fn test_events_outside_folders_ignored() {
        let (lookup, _) = lookup_with(two_folder_tree());
        lookup.add_folder(Path::new("/one")).await.unwrap().await.unwrap();

        lookup
            .file_changed(Path::new("/elsewhere/z.omt"), Some("moduleName: Z\n"))
            .await;
        lookup.file_changed(Path::new("/elsewhere/tsconfig.json"), None).await;

        assert!(lookup.module_path("Z").await.is_none());
        assert!(lookup.aliases().read().await.is_empty());
    }
}

//! Library integration tests for omt-lsp
//!
//! These tests drive the workspace lookup, the document index and the
//! reference resolver together against a real directory tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use omt_core::{
    AnalysisContext, DiskFileSystem, FileSystem, ImportTarget, Position, ReferenceResolver,
};
use omt_lsp::config::WorkspaceSettings;
use omt_lsp::navigation::{hover_text, usage_at};
use omt_lsp::{DocumentIndex, WorkspaceLookup};

const FILE1: &str = "moduleName: FileOne\n\
model:\n\
\x20   File1Activity: !Activity\n\
\x20       params:\n\
\x20       -   $target\n";

const MAIN: &str = "import:\n\
\x20   '@test/file1.omt':\n\
\x20   -   File1Activity\n\
\x20   module:FileOne:\n\
\x20   -   File1Activity\n\
model:\n\
\x20   MainActivity: !Activity\n\
\x20       onStart: |\n\
\x20           @File1Activity($target);\n";

fn write_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(
        root.join("tsconfig.json"),
        r#"{ "compilerOptions": { "paths": { "@test/*": ["./*"] } } }"#,
    )
    .unwrap();
    fs::write(root.join("file1.omt"), FILE1).unwrap();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("app").join("main.omt"), MAIN).unwrap();
    dir
}

fn services() -> (WorkspaceLookup, DocumentIndex) {
    let fs: Arc<dyn FileSystem> = Arc::new(DiskFileSystem);
    let lookup = WorkspaceLookup::new(Arc::clone(&fs), WorkspaceSettings::default());
    let index = DocumentIndex::new(fs, lookup.aliases(), Duration::from_millis(10));
    (lookup, index)
}

#[tokio::test]
async fn test_folder_scan_finds_modules_and_aliases() {
    let dir = write_workspace();
    let (lookup, _) = services();

    let found = lookup.add_folder(dir.path()).await.unwrap().await.unwrap();

    assert_eq!(found, 1);
    assert_eq!(
        lookup.module_path("FileOne").await,
        Some(dir.path().join("file1.omt"))
    );
    assert_eq!(lookup.aliases().read().await.len(), 1);
}

#[tokio::test]
async fn test_alias_import_resolves_to_imported_definition() {
    let dir = write_workspace();
    let (lookup, index) = services();
    lookup.add_folder(dir.path()).await.unwrap().await.unwrap();
    let main = dir.path().join("app").join("main.omt");

    let analysis = index.get(&main).await.unwrap();

    let file_import = analysis
        .imports
        .iter()
        .find(|import| import.declared_url == "@test/file1.omt")
        .unwrap();
    assert_eq!(
        file_import.target,
        ImportTarget::File(dir.path().join("file1.omt"))
    );

    // `@File1Activity($target)` on line 8, after 12 spaces and the `@`
    let usage = usage_at(&analysis, Position::new(8, 14)).unwrap();
    assert_eq!(usage.name, "File1Activity");

    let registry = lookup.registry();
    let registry = registry.read().await;
    let aliases = lookup.aliases();
    let aliases = aliases.read().await;
    let disk = DiskFileSystem;
    let context = AnalysisContext::new(&disk, &aliases);
    let definitions = ReferenceResolver::new(context, &registry).resolve(&usage.name, &analysis, &main);

    // both imports lead to file1.omt, which is searched once
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].path, dir.path().join("file1.omt"));
    assert_eq!(hover_text(&definitions).as_deref(), Some("File1Activity($target)"));
}

#[tokio::test]
async fn test_removed_folder_forgets_modules() {
    let dir = write_workspace();
    let (lookup, _) = services();
    lookup.add_folder(dir.path()).await.unwrap().await.unwrap();

    lookup.remove_folder(dir.path()).await.unwrap();

    assert_eq!(lookup.module_count().await, 0);
    assert!(lookup.aliases().read().await.is_empty());
}

#[tokio::test]
async fn test_edit_is_picked_up_after_debounce() {
    let dir = write_workspace();
    let (_, index) = services();
    let main = dir.path().join("app").join("main.omt");
    index.open(&main, MAIN.to_string()).await;

    index.invalidate(&main, "model:\n    Edited: !Activity\n".to_string());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let analysis = index.get(&main).await.unwrap();
    assert_eq!(analysis.declared_symbols.len(), 1);
    assert_eq!(analysis.declared_symbols[0].name, "Edited");
}

#[tokio::test]
async fn test_changed_file_on_disk_updates_module_name() {
    let dir = write_workspace();
    let (lookup, _) = services();
    lookup.add_folder(dir.path()).await.unwrap().await.unwrap();
    let file1 = dir.path().join("file1.omt");

    fs::write(&file1, FILE1.replace("FileOne", "Renamed")).unwrap();
    lookup.file_changed(Path::new(&file1), None).await;

    assert!(lookup.module_path("FileOne").await.is_none());
    assert_eq!(lookup.module_path("Renamed").await, Some(file1));
}

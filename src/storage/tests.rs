use std::{fs, sync::Arc};

use tempfile::tempdir;

use crate::remote::fake::FakeRemote;

use super::*;

fn sorted_names(mut entries: Vec<crate::retention::Entry>) -> Vec<String> {
    entries.sort_by_key(|entry| entry.created);
    entries.into_iter().map(|entry| entry.name).collect()
}

#[tokio::test]
async fn local_store_lists_only_timestamped_archives() {
    let dir = tempdir().unwrap();
    for name in ["300.tar.gz", "1000.tar.gz", "notes.tar.gz", "200.tar", "x.txt"] {
        fs::write(dir.path().join(name), b"x").unwrap();
    }
    fs::create_dir(dir.path().join("500.tar.gz.d")).unwrap();

    let store = LocalStore::new(dir.path());
    let entries = store.entries().await.unwrap();
    assert_eq!(sorted_names(entries), ["300.tar.gz", "1000.tar.gz"]);
}

#[tokio::test]
async fn local_store_handles_glob_characters_in_path() {
    let root = tempdir().unwrap();
    let dir = root.path().join("backups [daily]");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("42.tar.gz"), b"x").unwrap();

    let store = LocalStore::new(&dir);
    let entries = store.entries().await.unwrap();
    assert_eq!(sorted_names(entries), ["42.tar.gz"]);
}

#[tokio::test]
async fn local_store_deletes_by_path() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("1.tar.gz"), b"x").unwrap();
    fs::write(dir.path().join("2.tar.gz"), b"x").unwrap();

    let store = LocalStore::new(dir.path());
    let entries = store.entries().await.unwrap();
    let oldest = entries.iter().find(|entry| entry.created == 1).unwrap();
    store.delete(oldest).await.unwrap();

    assert!(!dir.path().join("1.tar.gz").exists());
    assert!(dir.path().join("2.tar.gz").exists());
    assert!(store.delete(oldest).await.is_err());
}

#[tokio::test]
async fn remote_store_skips_untimestamped_items() {
    let fake = Arc::new(FakeRemote::default());
    let folder = fake.add_folder("backups");
    fake.add_file("10.tar.gz");
    fake.add_file("9.tar.gz");
    fake.add_file("readme.md");

    let store = RemoteStore::new(fake.client(), folder);
    let entries = store.entries().await.unwrap();
    assert_eq!(sorted_names(entries.clone()), ["9.tar.gz", "10.tar.gz"]);

    let newest = entries.iter().find(|entry| entry.created == 10).unwrap();
    store.delete(newest).await.unwrap();
    assert_eq!(fake.file_names(), ["9.tar.gz", "readme.md"]);
}

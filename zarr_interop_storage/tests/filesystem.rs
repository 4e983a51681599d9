#![allow(missing_docs)]

use std::error::Error;

use zarr_interop_storage::{
    Bytes, FilesystemStore, ListableStorageTraits, ReadableStorageTraits, StoreKey, StorePrefix,
    WritableStorageTraits,
};

#[test]
fn filesystem_set_get() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?.sorted();

    let key = StoreKey::new("gzip/0.0.0")?;
    assert!(store.get(&key)?.is_none());
    store.set(&key, Bytes::from_static(&[1, 2, 3]))?;
    assert_eq!(store.get(&key)?.unwrap().as_ref(), &[1, 2, 3]);
    assert_eq!(store.size_key(&key)?, Some(3));

    // keys map to real files under the base path
    assert!(path.path().join("gzip").join("0.0.0").is_file());

    // replacing a value is a truncating overwrite
    store.set(&key, Bytes::from_static(&[9]))?;
    assert_eq!(store.get(&key)?.unwrap().as_ref(), &[9]);
    Ok(())
}

#[test]
fn filesystem_list() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?.sorted();

    store.set(&StoreKey::new("raw/.zarray")?, Bytes::new())?;
    store.set(&StoreKey::new("raw/0.0.0")?, Bytes::new())?;
    store.set(&StoreKey::new("gzip/0.0.0")?, Bytes::new())?;

    assert_eq!(store.list()?.len(), 3);
    let raw = StorePrefix::new("raw/")?;
    assert_eq!(
        store.list_prefix(&raw)?,
        vec![StoreKey::new("raw/.zarray")?, StoreKey::new("raw/0.0.0")?]
    );
    let root = store.list_dir(&StorePrefix::root())?;
    assert_eq!(
        root.prefixes(),
        &[StorePrefix::new("gzip/")?, StorePrefix::new("raw/")?]
    );
    assert!(root.keys().is_empty());
    Ok(())
}

#[test]
fn filesystem_erase_prefix() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?;

    store.set(&StoreKey::new("raw/0.0.0")?, Bytes::new())?;
    store.set(&StoreKey::new("gzip/0.0.0")?, Bytes::new())?;
    store.erase_prefix(&StorePrefix::new("raw/")?)?;
    assert!(store.get(&StoreKey::new("raw/0.0.0")?)?.is_none());
    assert!(store.get(&StoreKey::new("gzip/0.0.0")?)?.is_some());
    // erasing an absent prefix succeeds
    store.erase_prefix(&StorePrefix::new("raw/")?)?;
    Ok(())
}

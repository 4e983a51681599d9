#![allow(missing_docs)]

use std::error::Error;
use std::sync::Arc;

use zarr_interop::array::{Array, DataType};
use zarr_interop::dataset::{DatasetBuilder, Layout};
use zarr_interop::fixture::{dataset_path, write_fixture, FixtureConfig};
use zarr_interop::verify::{verify_dataset, VerifyError};
use zarr_interop_codec::Codec;
use zarr_interop_storage::{FilesystemStore, MemoryStore, ReadableStorageTraits};

/// A 3-channel image-like reference array with value gradients in every
/// dimension, mirroring the reference fixture scenario.
fn reference_array() -> Array {
    let (channels, height, width) = (3u64, 512u64, 512u64);
    let mut bytes = Vec::with_capacity((channels * height * width) as usize);
    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                bytes.push(((x + y * 3 + c * 101) % 256) as u8);
            }
        }
    }
    Array::new(vec![channels, height, width], DataType::UInt8, bytes).unwrap()
}

const LAYOUTS: [Layout; 3] = [
    Layout::ZarrV2 {
        separator: zarr_interop::chunk_key_encoding::ChunkKeySeparator::Dot,
    },
    Layout::ZarrV2 {
        separator: zarr_interop::chunk_key_encoding::ChunkKeySeparator::Slash,
    },
    Layout::N5,
];

#[test]
fn round_trip_every_codec_every_layout() -> Result<(), Box<dyn Error>> {
    // chunk shape chosen so the grid has overhanging edge chunks
    let array = reference_array();
    for layout in LAYOUTS {
        for id in Codec::supported_ids() {
            if layout == Layout::n5() && *id == "zlib" {
                // zlib has no n5 compression type
                continue;
            }
            let storage = Arc::new(MemoryStore::new());
            let dataset = DatasetBuilder::new(
                array.shape().clone(),
                vec![1, 100, 100],
                array.data_type(),
                Codec::from_id(id)?,
            )
            .layout(layout)
            .build(storage.clone(), id)?;
            dataset.write_array(&array)?;
            let read = dataset.read_array()?;
            assert_eq!(read, array, "round trip failed for {id} in {layout:?}");
            verify_dataset(storage, id, &array)?;
        }
    }
    Ok(())
}

#[test]
fn fixture_trees_verify_on_the_filesystem() -> Result<(), Box<dyn Error>> {
    let array = reference_array();
    let dir = tempfile::TempDir::new()?;

    for (name, layout) in [
        ("fixture_flat.zr", Layout::zarr_v2_flat()),
        ("fixture_nested.zr", Layout::zarr_v2_nested()),
        ("fixture.n5", Layout::n5()),
    ] {
        let storage = Arc::new(FilesystemStore::new(dir.path().join(name))?);
        let mut config = FixtureConfig::new(layout, vec![1, 100, 100]);
        config.parallel = true;
        write_fixture(&storage, &array, &config)?;

        for id in &config.codecs {
            let path = dataset_path(&Codec::from_id(id)?);
            verify_dataset(storage.clone(), &path, &array)?;
        }
    }

    // nested chunk keys become nested directories; flat keys single files
    assert!(dir
        .path()
        .join("fixture_flat.zr")
        .join("gzip")
        .join("0.0.0")
        .is_file());
    assert!(dir
        .path()
        .join("fixture_nested.zr")
        .join("gzip")
        .join("0")
        .join("0")
        .join("0")
        .is_file());
    // n5 keys are reversed
    assert!(dir
        .path()
        .join("fixture.n5")
        .join("gzip")
        .join("5")
        .join("5")
        .join("2")
        .is_file());
    assert!(dir.path().join("fixture.n5").join("attributes.json").is_file());
    Ok(())
}

#[test]
fn fixture_file_inventory() -> Result<(), Box<dyn Error>> {
    // 5x6 array in 2x2 chunks: 3x3 grid per dataset
    let bytes: Vec<u8> = (0..30).collect();
    let array = Array::new(vec![5, 6], DataType::UInt8, bytes)?;
    let dir = tempfile::TempDir::new()?;
    let storage = Arc::new(FilesystemStore::new(dir.path())?);
    let config = FixtureConfig::new(Layout::zarr_v2_flat(), vec![2, 2]);
    write_fixture(&storage, &array, &config)?;

    let mut files: Vec<String> = walkdir::WalkDir::new(dir.path())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();

    // 4 datasets, each .zarray + 9 chunks, plus the root .zgroup
    assert_eq!(files.len(), 1 + 4 * 10);
    assert!(files.contains(&".zgroup".to_string()));
    assert!(files.contains(&"raw/.zarray".to_string()));
    assert!(files.contains(&"raw/2.2".to_string()));
    assert!(files.contains(&"blosc/lz4/.zarray".to_string()));
    assert!(files.contains(&"blosc/lz4/0.1".to_string()));
    Ok(())
}

#[test]
fn datasets_do_not_cross_contaminate() -> Result<(), Box<dyn Error>> {
    let array = Array::new(vec![4, 4], DataType::UInt8, (0..16).collect())?;
    let storage = Arc::new(MemoryStore::new());

    let build = |path: &str, id: &str| -> Result<_, Box<dyn Error>> {
        let dataset = DatasetBuilder::new(
            array.shape().clone(),
            vec![2, 2],
            array.data_type(),
            Codec::from_id(id)?,
        )
        .build(storage.clone(), path)?;
        Ok(dataset)
    };

    let raw = build("raw", "raw")?;
    raw.write_array(&array)?;
    let snapshot: Vec<_> = (0..4)
        .map(|i| raw.get_chunk(&[i / 2, i % 2]).unwrap())
        .collect();

    // writing a second dataset leaves the first untouched
    let gzip = build("gzip", "gzip")?;
    gzip.write_array(&array)?;
    // and rewriting its chunks with different data too
    let other = Array::new(vec![4, 4], DataType::UInt8, (100..116).collect())?;
    gzip.write_array(&other)?;

    for i in 0..4 {
        assert_eq!(raw.get_chunk(&[i / 2, i % 2])?, snapshot[i as usize]);
    }
    assert_eq!(raw.read_array()?, array);
    assert_eq!(gzip.read_array()?, other);
    Ok(())
}

#[test]
fn verify_catches_tampering() -> Result<(), Box<dyn Error>> {
    use zarr_interop_storage::{Bytes, StoreKey, WritableStorageTraits};

    let array = Array::new(vec![4, 4], DataType::UInt8, (0..16).collect())?;
    let storage = Arc::new(MemoryStore::new());
    let dataset = DatasetBuilder::new(
        array.shape().clone(),
        vec![2, 2],
        array.data_type(),
        Codec::from_id("raw")?,
    )
    .build(storage.clone(), "raw")?;
    dataset.write_array(&array)?;
    verify_dataset(storage.clone(), "raw", &array)?;

    // flip one byte of one stored chunk
    let key = StoreKey::new("raw/1.1")?;
    let mut payload = storage.get(&key)?.unwrap().to_vec();
    payload[0] ^= 0xff;
    storage.set(&key, Bytes::from(payload))?;

    assert!(matches!(
        verify_dataset(storage, "raw", &array),
        Err(VerifyError::ValueMismatch { .. })
    ));
    Ok(())
}

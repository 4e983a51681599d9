#![allow(missing_docs)]

use std::error::Error;
use std::sync::Arc;

use zarr_interop::array::{Array, DataType};
use zarr_interop::dataset::{
    Dataset, DatasetBuilder, DatasetError, Layout, MissingChunkBehavior,
};
use zarr_interop_codec::Codec;
use zarr_interop_storage::{
    MemoryStore, ReadableStorageTraits, StoreKey, WritableStorageTraits,
};

fn gradient_array(shape: Vec<u64>) -> Array {
    let num_elements: u64 = shape.iter().product();
    let bytes: Vec<u8> = (0..num_elements).map(|i| (i % 251) as u8).collect();
    Array::new(shape, DataType::UInt8, bytes).unwrap()
}

#[test]
fn metadata_reopen_returns_creation_values() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    for (path, layout) in [
        ("v2", Layout::zarr_v2_nested()),
        ("n5", Layout::n5()),
    ] {
        DatasetBuilder::new(
            vec![10, 20],
            vec![4, 8],
            DataType::UInt16,
            Codec::from_id("gzip")?,
        )
        .layout(layout)
        .build(storage.clone(), path)?;

        let reopened = Dataset::open(storage.clone(), path)?;
        assert_eq!(reopened.shape(), &vec![10, 20]);
        assert_eq!(reopened.grid().chunk_shape_u64(), vec![4, 8]);
        assert_eq!(reopened.data_type(), DataType::UInt16);
        assert_eq!(reopened.codec().id(), "gzip");
        assert_eq!(reopened.layout(), layout);
    }
    Ok(())
}

#[test]
fn existing_dataset_needs_overwrite() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let builder = DatasetBuilder::new(
        vec![4],
        vec![2],
        DataType::UInt8,
        Codec::from_id("raw")?,
    );
    builder.clone().build(storage.clone(), "ds")?;
    assert!(matches!(
        builder.clone().build(storage.clone(), "ds"),
        Err(DatasetError::DatasetExists(_))
    ));
    builder.overwrite(true).build(storage, "ds")?;
    Ok(())
}

#[test]
fn v2_edge_chunks_stored_padded() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let array = gradient_array(vec![5]);
    let dataset = DatasetBuilder::new(
        vec![5],
        vec![2],
        DataType::UInt8,
        Codec::from_id("raw")?,
    )
    .build(storage.clone(), "raw")?;
    dataset.write_array(&array)?;

    // the edge chunk has extent 1 but is stored at the nominal chunk shape,
    // padded with the fill value
    let payload = storage.get(&StoreKey::new("raw/2")?)?.unwrap();
    assert_eq!(payload.as_ref(), &[4, 0]);
    // and crops back to its true extent
    assert_eq!(dataset.get_chunk(&[2])?, vec![4]);
    assert_eq!(dataset.read_array()?, array);
    Ok(())
}

#[test]
fn n5_edge_chunks_stored_truncated() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let array = gradient_array(vec![5]);
    let dataset = DatasetBuilder::new(
        vec![5],
        vec![2],
        DataType::UInt8,
        Codec::from_id("raw")?,
    )
    .layout(Layout::n5())
    .build(storage.clone(), "raw")?;
    dataset.write_array(&array)?;

    // header: mode 0, ndim 1, extent 1; payload: one element
    let payload = storage.get(&StoreKey::new("raw/2")?)?.unwrap();
    assert_eq!(payload.as_ref(), &[0, 0, 0, 1, 0, 0, 0, 1, 4]);
    assert_eq!(dataset.read_array()?, array);
    Ok(())
}

#[test]
fn n5_multi_byte_payloads_are_big_endian() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let values: Vec<u16> = vec![0x0102, 0x0304];
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let array = Array::new(vec![2], DataType::UInt16, bytes)?;
    let dataset = DatasetBuilder::new(
        vec![2],
        vec![2],
        DataType::UInt16,
        Codec::from_id("raw")?,
    )
    .layout(Layout::n5())
    .build(storage.clone(), "raw")?;
    dataset.write_array(&array)?;

    let payload = storage.get(&StoreKey::new("raw/0")?)?.unwrap();
    // 8 header bytes then the elements, most significant byte first
    assert_eq!(&payload.as_ref()[8..], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(dataset.read_array()?, array);
    Ok(())
}

#[test]
fn missing_chunk_errors_by_default() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let dataset = DatasetBuilder::new(
        vec![4],
        vec![2],
        DataType::UInt8,
        Codec::from_id("raw")?,
    )
    .build(storage, "ds")?;

    assert!(matches!(
        dataset.get_chunk(&[0]),
        Err(DatasetError::MissingChunk(_))
    ));

    let dataset = dataset.with_missing_chunk_behavior(MissingChunkBehavior::FillValue);
    assert_eq!(dataset.get_chunk(&[0])?, vec![0, 0]);
    assert_eq!(dataset.read_array()?, Array::zeros(vec![4], DataType::UInt8));
    Ok(())
}

#[test]
fn out_of_bounds_chunk_indices() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let dataset = DatasetBuilder::new(
        vec![4],
        vec![2],
        DataType::UInt8,
        Codec::from_id("raw")?,
    )
    .build(storage, "ds")?;
    assert!(matches!(
        dataset.put_chunk(&[2], &[0, 0]),
        Err(DatasetError::InvalidChunkGridIndices { .. })
    ));
    assert!(matches!(
        dataset.put_chunk(&[0, 0], &[0, 0]),
        Err(DatasetError::InvalidChunkGridIndices { .. })
    ));
    Ok(())
}

#[test]
fn rewriting_a_chunk_is_last_writer_wins() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let dataset = DatasetBuilder::new(
        vec![4],
        vec![2],
        DataType::UInt8,
        Codec::from_id("gzip")?,
    )
    .build(storage, "ds")?;
    dataset.put_chunk(&[0], &[1, 2])?;
    dataset.put_chunk(&[1], &[3, 4])?;
    dataset.put_chunk(&[0], &[9, 8])?;
    assert_eq!(dataset.get_chunk(&[0])?, vec![9, 8]);
    // the neighbouring chunk is untouched
    assert_eq!(dataset.get_chunk(&[1])?, vec![3, 4]);
    Ok(())
}

#[test]
fn unknown_compressor_in_metadata() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let metadata = serde_json::json!({
        "zarr_format": 2,
        "shape": [4],
        "chunks": [2],
        "dtype": "|u1",
        "compressor": {"id": "lzma", "preset": 1},
        "fill_value": 0,
        "order": "C",
        "filters": null
    });
    storage.set(
        &StoreKey::new("ds/.zarray")?,
        serde_json::to_vec(&metadata)?.into(),
    )?;
    assert!(matches!(
        Dataset::open(storage, "ds"),
        Err(DatasetError::UnsupportedCodec(_))
    ));
    Ok(())
}

#[test]
fn corrupt_chunk_payload_reports_codec_and_coordinate() -> Result<(), Box<dyn Error>> {
    let storage = Arc::new(MemoryStore::new());
    let dataset = DatasetBuilder::new(
        vec![4],
        vec![2],
        DataType::UInt8,
        Codec::from_id("gzip")?,
    )
    .build(storage.clone(), "ds")?;
    dataset.write_array(&gradient_array(vec![4]))?;

    storage.set(&StoreKey::new("ds/1")?, vec![0xde, 0xad].into())?;
    match dataset.get_chunk(&[1]) {
        Err(DatasetError::Codec {
            codec_id,
            chunk_indices,
            ..
        }) => {
            assert_eq!(codec_id, "gzip");
            assert_eq!(chunk_indices, vec![1]);
        }
        other => panic!("expected a codec error, got {other:?}"),
    }
    Ok(())
}

//! Tests for sharded and single-file stores
//!
//! These tests verify:
//! - Near-equal partitioning with leading remainder
//! - Per-shard NumPart_ThisFile bookkeeping and count conservation
//! - Header bookkeeping (NumFilesPerSnapshot, stored integer variants)
//! - Validation before any container is written
//! - File-backed stores under a temp directory

use std::path::{Path, PathBuf};

use snapshard::container::{ContainerBackend, ContainerHandle, FileBackend, MemoryBackend, OpenMode};
use snapshard::header::{HEADER_GROUP, NUM_FILES_PER_SNAPSHOT, NUM_PART_THIS_FILE};
use snapshard::{
    Array, AttrValue, Config, FieldMap, Header, ParticleData, SnapshotError, SnapshotIo, Species,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("snapshot_010");
    (temp_dir, base)
}

fn fields(entries: Vec<(&str, Array)>) -> FieldMap {
    entries
        .into_iter()
        .map(|(name, array)| (name.to_string(), array))
        .collect()
}

/// Species 1 with ids [10..=14]
fn five_dark_matter() -> (Header, ParticleData) {
    let header = Header::with_totals([0, 5, 0, 0, 0, 0]);
    let mut particles = ParticleData::new();
    particles.insert(
        Species::DARK_MATTER,
        fields(vec![("ParticleIDs", Array::from(vec![10u64, 11, 12, 13, 14]))]),
    );
    (header, particles)
}

fn shard_header(backend: &MemoryBackend, path: &str) -> Header {
    let tree = backend.tree(Path::new(path)).unwrap();
    Header::from_attrs(tree.read_attrs(HEADER_GROUP).unwrap())
}

fn shard_ids(backend: &MemoryBackend, path: &str, species: Species) -> Vec<u64> {
    let tree = backend.tree(Path::new(path)).unwrap();
    tree.read_dataset(&species.group_name(), "ParticleIDs")
        .unwrap()
        .as_u64()
        .unwrap()
        .to_vec()
}

// =============================================================================
// Partitioning Tests
// =============================================================================

#[test]
fn test_store_two_shards() {
    let backend = MemoryBackend::new();
    let (header, particles) = five_dark_matter();

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 2, &header, &particles)
        .unwrap();

    assert_eq!(backend.file_count(), 2);
    assert_eq!(shard_ids(&backend, "snap.0.mem", Species::DARK_MATTER), vec![10, 11, 12]);
    assert_eq!(shard_ids(&backend, "snap.1.mem", Species::DARK_MATTER), vec![13, 14]);

    assert_eq!(
        shard_header(&backend, "snap.0.mem").num_part_this_file().unwrap(),
        [0, 3, 0, 0, 0, 0]
    );
    assert_eq!(
        shard_header(&backend, "snap.1.mem").num_part_this_file().unwrap(),
        [0, 2, 0, 0, 0, 0]
    );
}

#[test]
fn test_fields_of_a_species_split_alike() {
    let backend = MemoryBackend::new();
    let header = Header::with_totals([3, 7, 0, 0, 0, 0]);
    let mut particles = ParticleData::new();
    particles.insert(
        Species::GAS,
        fields(vec![
            ("ParticleIDs", Array::from(vec![1u64, 2, 3])),
            ("Masses", Array::from(vec![0.1f32, 0.2, 0.3])),
        ]),
    );
    particles.insert(
        Species::DARK_MATTER,
        fields(vec![
            ("ParticleIDs", Array::from((100u64..107).collect::<Vec<_>>())),
            ("Coordinates", Array::vector((0..21).map(|x| x as f64).collect::<Vec<_>>(), 3).unwrap()),
        ]),
    );

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 3, &header, &particles)
        .unwrap();

    let mut conserved = [0u64; 6];
    for (index, expected) in [[1, 3], [1, 2], [1, 2]].iter().enumerate() {
        let path = format!("snap.{}.mem", index);
        let this_file = shard_header(&backend, &path).num_part_this_file().unwrap();
        assert_eq!(this_file[0], expected[0]);
        assert_eq!(this_file[1], expected[1]);

        let tree = backend.tree(Path::new(&path)).unwrap();
        let coords = tree.read_dataset("PartType1", "Coordinates").unwrap();
        assert_eq!(coords.rows() as u64, expected[1]);
        assert_eq!(coords.components(), Some(3));
        let masses = tree.read_dataset("PartType0", "Masses").unwrap();
        assert_eq!(masses.rows() as u64, expected[0]);

        for (total, count) in conserved.iter_mut().zip(this_file) {
            *total += count;
        }
    }
    assert_eq!(conserved, header.particle_totals().unwrap());
}

#[test]
fn test_more_shards_than_particles() {
    let backend = MemoryBackend::new();
    let header = Header::with_totals([0, 0, 0, 0, 2, 0]);
    let mut particles = ParticleData::new();
    particles.insert(
        Species::STARS,
        fields(vec![("ParticleIDs", Array::from(vec![8u64, 9]))]),
    );

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 4, &header, &particles)
        .unwrap();

    let counts: Vec<u64> = (0..4)
        .map(|i| shard_header(&backend, &format!("snap.{}.mem", i)).num_part_this_file().unwrap()[4])
        .collect();
    assert_eq!(counts, vec![1, 1, 0, 0]);
    assert!(shard_ids(&backend, "snap.3.mem", Species::STARS).is_empty());
}

#[test]
fn test_inactive_species_not_written() {
    let backend = MemoryBackend::new();
    let (header, mut particles) = five_dark_matter();
    particles.insert(
        Species::GAS,
        fields(vec![("ParticleIDs", Array::from(vec![1u64]))]),
    );

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 2, &header, &particles)
        .unwrap();

    let tree = backend.tree(Path::new("snap.0.mem")).unwrap();
    assert!(!tree.has_group("PartType0"));
    assert!(tree.has_group("PartType1"));
    assert_eq!(
        shard_header(&backend, "snap.0.mem").num_part_this_file().unwrap()[0],
        0
    );
}

#[test]
fn test_custom_identifier_field() {
    let backend = MemoryBackend::new();
    let header = Header::with_totals([0, 3, 0, 0, 0, 0]);
    let mut particles = ParticleData::new();
    particles.insert(
        Species::DARK_MATTER,
        fields(vec![("TracerIDs", Array::from(vec![1u32, 2, 3]))]),
    );

    let config = Config::builder().identifier_field("TracerIDs").build();
    SnapshotIo::new(config, backend.clone())
        .store("snap", 2, &header, &particles)
        .unwrap();

    assert_eq!(
        shard_header(&backend, "snap.0.mem").num_part_this_file().unwrap()[1],
        2
    );
}

// =============================================================================
// Header Bookkeeping Tests
// =============================================================================

#[test]
fn test_file_count_attribute_updated() {
    let backend = MemoryBackend::new();
    let (mut header, particles) = five_dark_matter();
    header.set(NUM_FILES_PER_SNAPSHOT, AttrValue::Int(1));

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 3, &header, &particles)
        .unwrap();

    for index in 0..3 {
        let shard = shard_header(&backend, &format!("snap.{}.mem", index));
        assert_eq!(shard.get(NUM_FILES_PER_SNAPSHOT), Some(&AttrValue::Int(3)));
    }
}

#[test]
fn test_signed_counts_stay_signed() {
    let backend = MemoryBackend::new();
    let (mut header, particles) = five_dark_matter();
    header.set(NUM_PART_THIS_FILE, AttrValue::IntArray(vec![0, 5, 0, 0, 0, 0]));

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 2, &header, &particles)
        .unwrap();

    assert_eq!(
        shard_header(&backend, "snap.1.mem").get(NUM_PART_THIS_FILE),
        Some(&AttrValue::IntArray(vec![0, 2, 0, 0, 0, 0]))
    );
}

#[test]
fn test_caller_header_untouched() {
    let backend = MemoryBackend::new();
    let (header, particles) = five_dark_matter();
    let before = header.clone();

    SnapshotIo::with_backend(backend)
        .store("snap", 2, &header, &particles)
        .unwrap();

    assert_eq!(header, before);
}

// =============================================================================
// Single-File Tests
// =============================================================================

#[test]
fn test_single_file_store() {
    let backend = MemoryBackend::new();
    let (mut header, particles) = five_dark_matter();
    header.set(NUM_PART_THIS_FILE, AttrValue::UIntArray(vec![0, 2, 0, 0, 0, 0]));
    header.set(NUM_FILES_PER_SNAPSHOT, AttrValue::UInt(4));

    SnapshotIo::with_backend(backend.clone())
        .store("snap", 1, &header, &particles)
        .unwrap();

    assert!(backend.contains(Path::new("snap.mem")));
    let stored = shard_header(&backend, "snap.mem");
    assert_eq!(stored.num_part_this_file().unwrap(), [0, 5, 0, 0, 0, 0]);
    assert_eq!(stored.get(NUM_FILES_PER_SNAPSHOT), Some(&AttrValue::UInt(1)));
    assert_eq!(
        shard_ids(&backend, "snap.mem", Species::DARK_MATTER),
        vec![10, 11, 12, 13, 14]
    );
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_missing_species_data_rejected() {
    let backend = MemoryBackend::new();
    let header = Header::with_totals([0, 5, 0, 0, 1, 0]);
    let (_, particles) = five_dark_matter();

    let err = SnapshotIo::with_backend(backend.clone())
        .store("snap", 2, &header, &particles)
        .unwrap_err();

    assert!(matches!(err, SnapshotError::InvalidArgument(_)));
    assert_eq!(backend.file_count(), 0);
}

#[test]
fn test_missing_identifier_field_rejected() {
    let backend = MemoryBackend::new();
    let header = Header::with_totals([0, 2, 0, 0, 0, 0]);
    let mut particles = ParticleData::new();
    particles.insert(
        Species::DARK_MATTER,
        fields(vec![("Masses", Array::from(vec![1.0f32, 1.0]))]),
    );

    let err = SnapshotIo::with_backend(backend.clone())
        .store("snap", 2, &header, &particles)
        .unwrap_err();

    assert!(matches!(err, SnapshotError::InvalidArgument(_)));
    assert_eq!(backend.file_count(), 0);
}

#[test]
fn test_field_length_must_match_total() {
    let backend = MemoryBackend::new();
    let (header, mut particles) = five_dark_matter();
    particles
        .get_mut(&Species::DARK_MATTER)
        .unwrap()
        .insert("Masses".to_string(), Array::from(vec![1.0f64; 4]));

    for nfiles in [1, 2] {
        let err = SnapshotIo::with_backend(backend.clone())
            .store("snap", nfiles, &header, &particles)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidArgument(_)));
    }
    assert_eq!(backend.file_count(), 0);
}

#[test]
fn test_zero_files_rejected() {
    let (header, particles) = five_dark_matter();

    let err = SnapshotIo::with_backend(MemoryBackend::new())
        .store("snap", 0, &header, &particles)
        .unwrap_err();
    assert!(matches!(err, SnapshotError::InvalidArgument(_)));
}

// =============================================================================
// File Backend Tests
// =============================================================================

#[test]
fn test_file_store_creates_shard_files() {
    let (_temp, base) = setup_temp_dir();
    let (header, particles) = five_dark_matter();

    snapshard::store(&base, 2, &header, &particles).unwrap();

    let first = base.with_file_name("snapshot_010.0.gzc");
    let second = base.with_file_name("snapshot_010.1.gzc");
    assert!(first.exists());
    assert!(second.exists());

    let handle = FileBackend.open(&second, OpenMode::Read).unwrap();
    let ids = handle.read_dataset("PartType1", "ParticleIDs").unwrap();
    assert_eq!(ids.as_u64().unwrap(), &[13, 14]);
    handle.close().unwrap();
}

#[test]
fn test_file_store_then_load() {
    let (_temp, base) = setup_temp_dir();
    let (header, particles) = five_dark_matter();

    snapshard::store(&base, 2, &header, &particles).unwrap();
    let snapshot = snapshard::load(&base, 2, Species::DARK_MATTER, "ParticleIDs").unwrap();

    assert_eq!(snapshot.header.particle_totals().unwrap(), [0, 5, 0, 0, 0, 0]);
    assert_eq!(
        snapshot
            .field(Species::DARK_MATTER, "ParticleIDs")
            .unwrap()
            .as_f64()
            .unwrap(),
        &[10.0, 11.0, 12.0, 13.0, 14.0]
    );
}

#[test]
fn test_restore_overwrites_previous_shards() {
    let (_temp, base) = setup_temp_dir();
    let (header, particles) = five_dark_matter();

    snapshard::store(&base, 2, &header, &particles).unwrap();
    snapshard::store(&base, 2, &header, &particles).unwrap();

    let snapshot = snapshard::load(&base, 2, Species::DARK_MATTER, "ParticleIDs").unwrap();
    assert_eq!(
        snapshot.field(Species::DARK_MATTER, "ParticleIDs").unwrap().rows(),
        5
    );
}

#[test]
fn test_failed_store_keeps_written_shards() {
    let (_temp, base) = setup_temp_dir();
    let (header, particles) = five_dark_matter();

    // A directory where shard 1 should go makes its open fail
    let blocked = base.with_file_name("snapshot_010.1.gzc");
    std::fs::create_dir(&blocked).unwrap();

    let err = snapshard::store(&base, 2, &header, &particles).unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)));

    let first = base.with_file_name("snapshot_010.0.gzc");
    assert!(first.exists());
    let handle = FileBackend.open(&first, OpenMode::Read).unwrap();
    let stored = Header::from_attrs(handle.read_attrs(HEADER_GROUP).unwrap());
    assert_eq!(stored.num_part_this_file().unwrap()[1], 3);
    assert_eq!(
        handle.read_dataset("PartType1", "ParticleIDs").unwrap().as_u64().unwrap(),
        &[10, 11, 12]
    );
    assert!(blocked.is_dir());
}

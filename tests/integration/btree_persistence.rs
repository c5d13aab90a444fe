#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;

use blockdex::primitives::pager::{decode_header, BlockFile, BLOCK_SIZE, MAGIC};
use blockdex::storage::btree::{decode_node, BTree, MAX_KEYS};
use blockdex::types::{BlockId, IndexError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

#[test]
fn fresh_file_is_a_single_header_block() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("fresh.idx");
    BTree::create(&path).expect("create");

    let bytes = fs::read(&path).expect("read file");
    assert_eq!(bytes.len(), BLOCK_SIZE);
    assert_eq!(&bytes[..8], &MAGIC);
    assert_eq!(&bytes[8..16], &0u64.to_be_bytes());
    assert_eq!(&bytes[16..24], &1u64.to_be_bytes());
    assert!(bytes[24..].iter().all(|b| *b == 0));
}

#[test]
fn first_insert_writes_root_leaf_at_block_one() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("one.idx");
    let mut tree = BTree::create(&path).expect("create");
    tree.insert(15, 150).expect("insert");
    drop(tree);

    let bytes = fs::read(&path).expect("read file");
    assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
    let header = decode_header(&bytes[..BLOCK_SIZE]).expect("header");
    assert_eq!(header.root, BlockId(1));
    assert_eq!(header.next_block, BlockId(2));

    let root = decode_node(&bytes[BLOCK_SIZE..]).expect("node");
    assert_eq!(root.block_id, BlockId(1));
    assert_eq!(root.parent, BlockId::NONE);
    assert_eq!(root.live_keys(), &[15]);
    assert_eq!(root.values[0], 150);
    assert!(root.is_leaf());
}

#[test]
fn contents_survive_reopen_across_many_splits() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("many.idx");
    let mut keys: Vec<u64> = (1..=1_500).collect();
    keys.shuffle(&mut ChaCha8Rng::seed_from_u64(0x5EED));

    let mut reference = BTreeMap::new();
    {
        let mut tree = BTree::create(&path).expect("create");
        for key in &keys {
            tree.insert(*key, key * 7).expect("insert");
            reference.insert(*key, key * 7);
        }
    }

    let tree = BTree::open(&path).expect("open");
    let summary = tree.verify().expect("verify");
    assert_eq!(summary.keys, 1_500);
    assert!(summary.height >= 3);

    let expected: Vec<(u64, u64)> = reference.into_iter().collect();
    assert_eq!(tree.traverse().expect("traverse"), expected);
    assert_eq!(tree.search(1_501).expect("search"), None);

    let len = fs::metadata(&path).expect("metadata").len();
    assert_eq!(len, tree.header().next_block.0 * BLOCK_SIZE as u64);
}

#[test]
fn twentieth_key_splits_the_root() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("split.idx");
    let mut tree = BTree::create(&path).expect("create");
    for key in 1..=(MAX_KEYS as u64 + 1) {
        tree.insert(key, key + 100).expect("insert");
    }
    drop(tree);

    let store = BlockFile::open(&path).expect("open blocks");
    let header = decode_header(&store.read_block(BlockId(0)).expect("block 0")).expect("header");
    assert_eq!(header.root, BlockId(2));
    assert_eq!(header.next_block, BlockId(4));

    let root = decode_node(&store.read_block(BlockId(2)).expect("root")).expect("decode");
    assert_eq!(root.live_keys(), &[10]);
    assert_eq!(root.live_children(), &[1, 3]);
    let left = decode_node(&store.read_block(BlockId(1)).expect("left")).expect("decode");
    let right = decode_node(&store.read_block(BlockId(3)).expect("right")).expect("decode");
    assert_eq!(left.live_keys(), (1..=9).collect::<Vec<u64>>().as_slice());
    assert_eq!(right.live_keys(), (11..=20).collect::<Vec<u64>>().as_slice());
    assert_eq!(left.parent, BlockId(2));
    assert_eq!(right.parent, BlockId(2));
}

#[test]
fn duplicate_insert_leaves_file_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("dup.idx");
    let mut tree = BTree::create(&path).expect("create");
    for key in 0..40u64 {
        tree.insert(key, key).expect("insert");
    }
    let before = fs::read(&path).expect("read");
    let err = tree.insert(17, 0).unwrap_err();
    assert!(matches!(err, IndexError::DuplicateKey(17)));
    assert_eq!(fs::read(&path).expect("read"), before);
    assert_eq!(tree.search(17).expect("search"), Some(17));
}

#[test]
fn foreign_and_short_files_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let foreign = dir.path().join("foreign.idx");
    fs::write(&foreign, vec![0xAAu8; BLOCK_SIZE]).expect("write");
    assert!(matches!(
        BTree::open(&foreign),
        Err(IndexError::Format("header magic mismatch"))
    ));

    let short = dir.path().join("short.idx");
    fs::write(&short, &MAGIC).expect("write");
    assert!(matches!(BTree::open(&short), Err(IndexError::Format(_))));

    let missing = dir.path().join("missing.idx");
    assert!(matches!(BTree::open(&missing), Err(IndexError::Io(_))));
}

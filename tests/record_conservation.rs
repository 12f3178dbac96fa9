mod common;

use common::{id, record, write_log};
use node_bloom::{filter_file_name, BloomFilter, Config, Id};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_log::test;

#[test]
fn every_input_pair_is_accepted_by_its_filter() -> node_bloom::Result<()> {
    let folder = tempfile::tempdir()?;
    let log = folder.path().join("input.dat");

    let mut rng = StdRng::seed_from_u64(5);
    let nodes = [id(0xaa, 0), id(0xaa, 1), id(0xbb, 0)];

    let records: Vec<_> = (0..3_000)
        .map(|_| {
            let node_id = nodes[rng.random_range(0..nodes.len())];
            record(node_id, Id::from_bytes(rng.random()))
        })
        .collect();
    write_log(&log, &records);

    Config::new(&log).folder(folder.path()).workers(4).run()?;

    let filters: Vec<BloomFilter> = nodes
        .iter()
        .map(|node_id| {
            let bitmap = std::fs::read(folder.path().join(filter_file_name(node_id)))?;
            Ok(BloomFilter::from_bytes(bitmap.into_boxed_slice()))
        })
        .collect::<node_bloom::Result<_>>()?;

    for rec in &records {
        let idx = nodes
            .iter()
            .position(|node_id| node_id == &rec.node_id)
            .expect("record node is known");
        assert!(filters[idx].contains(&rec.piece_id));
    }

    Ok(())
}

#[test]
fn membership_false_positives_stay_near_target() -> node_bloom::Result<()> {
    let folder = tempfile::tempdir()?;
    let log = folder.path().join("input.dat");

    let mut rng = StdRng::seed_from_u64(6);
    let node_id = id(0x77, 0x77);

    let records: Vec<_> = (0..20_000)
        .map(|_| record(node_id, Id::from_bytes(rng.random())))
        .collect();
    write_log(&log, &records);

    Config::new(&log).folder(folder.path()).workers(2).run()?;

    let bitmap = std::fs::read(folder.path().join(filter_file_name(&node_id)))?;
    let filter = BloomFilter::from_bytes(bitmap.into_boxed_slice());

    let mut false_positives = 0;
    for _ in 0..20_000 {
        if filter.contains(&Id::from_bytes(rng.random())) {
            false_positives += 1;
        }
    }

    let fpr = f64::from(false_positives) / 20_000.0;
    assert!(fpr > 0.05, "false positive rate {fpr} suspiciously low");
    assert!(fpr < 0.15, "false positive rate {fpr} above target");

    Ok(())
}

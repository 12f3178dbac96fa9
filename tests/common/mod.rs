#![allow(dead_code)]

use node_bloom::{Id, Record, ID_LEN};
use std::{fs::File, io::Write, path::Path};

/// Builds an identifier whose first byte is `lead` and whose remaining
/// bytes are `fill`.
pub fn id(lead: u8, fill: u8) -> Id {
    let mut bytes = [fill; ID_LEN];
    bytes[0] = lead;
    Id::from_bytes(bytes)
}

/// Builds an identifier carrying a counter in its first bytes.
pub fn numbered_id(n: u64) -> Id {
    let mut bytes = [0; ID_LEN];
    bytes[..8].copy_from_slice(&n.to_be_bytes());
    Id::from_bytes(bytes)
}

pub fn record(node_id: Id, piece_id: Id) -> Record {
    Record { node_id, piece_id }
}

/// Writes records as a flat log file.
pub fn write_log(path: &Path, records: &[Record]) {
    let mut file = File::create(path).unwrap();
    for record in records {
        file.write_all(&record.to_bytes()).unwrap();
    }
    file.sync_all().unwrap();
}

/// Sorted names of all `.dat` files in the folder.
pub fn dat_files(folder: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(folder)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".dat"))
        .collect::<Vec<_>>();
    names.sort();
    names
}

/// The emitted filter size for a partition of `n` records.
pub fn expected_filter_len(n: u64) -> usize {
    let bits_per_element = -1.44f64 * 0.1f64.log2();
    ((n as f64) * bits_per_element / 8.0).ceil() as usize
}

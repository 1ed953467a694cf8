mod test_utils;

use small_kv::{
    error::SmallError,
    wal::{TransactionType, Wal},
};

use crate::test_utils::setup;

fn new_wal() -> (Wal, tempfile::TempDir) {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let wal = Wal::open(dir.path().join("wal.txt")).unwrap();
    (wal, dir)
}

#[test]
fn test_xids_are_strictly_monotonic() {
    let (wal, _dir) = new_wal();

    let mut last = 0;
    for _ in 0..20 {
        let xid = wal.next_xid().unwrap();
        assert!(xid > last);
        last = xid;
    }
}

#[test]
fn test_first_xid_is_one() {
    let (wal, _dir) = new_wal();
    assert_eq!(wal.next_xid().unwrap(), 1);
}

#[test]
fn test_append_bumps_record_count() {
    let (wal, _dir) = new_wal();

    assert_eq!(wal.records_count().unwrap(), 0);

    wal.append(TransactionType::Insert, 1, 10).unwrap();
    wal.append(TransactionType::Insert, 2, 20).unwrap();
    wal.append(TransactionType::Delete, 3, 10).unwrap();

    assert_eq!(wal.records_count().unwrap(), 3);
}

#[test]
fn test_xid_sequence_survives_reopen() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.txt");

    {
        let wal = Wal::open(&path).unwrap();
        assert_eq!(wal.next_xid().unwrap(), 1);
        let xid = wal.next_xid().unwrap();
        wal.append(TransactionType::Insert, xid, 42).unwrap();
        wal.close().unwrap();
    }

    // the counter reseeds from the last record on disk
    let wal = Wal::open(&path).unwrap();
    assert_eq!(wal.next_xid().unwrap(), 3);
}

#[test]
fn test_operations_fail_after_close() {
    let (wal, _dir) = new_wal();

    wal.close().unwrap();

    assert_eq!(
        wal.next_xid().unwrap_err(),
        SmallError::WalNotInitialized
    );
    assert_eq!(
        wal.append(TransactionType::Insert, 1, 1).unwrap_err(),
        SmallError::WalNotInitialized
    );
    assert_eq!(wal.close().unwrap_err(), SmallError::WalNotInitialized);
}

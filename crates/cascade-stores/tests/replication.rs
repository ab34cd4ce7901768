//! End-to-end placement tests over real stores and the real placement
//! algorithm: bootstrap, fan-out, quota bookkeeping, eviction, fairness.

use std::sync::Arc;

use cascade_core::{sum, Chunk, Data};
use cascade_procs::{read_chunks, InplaceFunc, ProcError};
use cascade_stores::{
    Copier, CopierId, DirStore, DynProc, MemStore, QuotaManager, SliceLister, Store, StoreError,
    StripeProc,
};
use cascade_stripe::StripeConfig;

fn mem_copier(id: &str, store: &MemStore) -> Copier {
    Copier::new(CopierId::from(id), Arc::new(store.clone()), store.proc())
}

fn dir_copier(id: &str, store: &DirStore) -> Copier {
    Copier::new(CopierId::from(id), Arc::new(store.clone()), store.proc())
}

fn failing_copier(id: &str, msg: &'static str) -> Copier {
    Copier::new(
        CopierId::from(id),
        Arc::new(SliceLister::default()),
        Arc::new(InplaceFunc(move |_: &mut Chunk| Err(ProcError::other(msg)))),
    )
}

fn chunk_of(payload: Vec<u8>) -> Chunk {
    Chunk::new(sum(&payload), Data::from(payload))
}

async fn drive(sp: &StripeProc, chunk: &Chunk) -> Option<ProcError> {
    let procs = sp.procs(chunk).await.unwrap();
    let mut first = None;
    for proc in procs {
        let (_, err) = read_chunks(proc.process(chunk.clone()).await).await;
        if first.is_none() {
            first = err;
        }
    }
    first
}

#[tokio::test]
async fn triple_replication_tops_up_to_min() {
    let (mem_a, mem_b, mem_c) = (MemStore::new(), MemStore::new(), MemStore::new());
    let chunk = chunk_of(vec![7u8; 100]);
    // "a" already holds the chunk; the bootstrap scan must discover it
    mem_a.set(chunk.hash(), chunk.data().bytes().unwrap().clone());

    let qman = Arc::new(QuotaManager::new());
    qman.add_res(mem_copier("a", &mem_a));
    qman.add_res(mem_copier("b", &mem_b));
    qman.add_res(mem_copier("c", &mem_c));

    let striper = Arc::new(StripeConfig {
        distinct: 1,
        min: 3,
    });
    let sp = StripeProc::new(striper, Arc::clone(&qman)).await.unwrap();

    assert!(drive(&sp, &chunk).await.is_none());

    // the two missing replicas were written, the existing one untouched
    assert!(mem_b.get(chunk.hash()).is_some());
    assert!(mem_c.get(chunk.hash()).is_some());
    assert_eq!(qman.used(&CopierId::from("a")), Some(100));
    assert_eq!(qman.used(&CopierId::from("b")), Some(100));
    assert_eq!(qman.used(&CopierId::from("c")), Some(100));

    // replaying the same chunk finds min already satisfied: nothing is
    // re-copied or re-charged
    assert!(drive(&sp, &chunk).await.is_none());
    assert_eq!(qman.used(&CopierId::from("b")), Some(100));
    assert_eq!(qman.used(&CopierId::from("c")), Some(100));
}

#[tokio::test]
async fn bootstrap_discovers_directory_contents() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let chunk = chunk_of(b"on disk already".to_vec());
    std::fs::write(
        dir_a.path().join(chunk.hash().to_hex()),
        chunk.data().bytes().unwrap(),
    )
    .unwrap();

    let store_a = DirStore::new(dir_a.path());
    let store_b = DirStore::new(dir_b.path());
    let qman = Arc::new(QuotaManager::new());
    qman.add_res(dir_copier("a", &store_a));
    qman.add_res(dir_copier("b", &store_b));

    let striper = Arc::new(StripeConfig {
        distinct: 0,
        min: 2,
    });
    let sp = StripeProc::new(striper, Arc::clone(&qman)).await.unwrap();

    assert!(drive(&sp, &chunk).await.is_none());

    // only the missing replica was written
    assert!(dir_b.path().join(chunk.hash().to_hex()).exists());
    let size = chunk.data().size().unwrap();
    assert_eq!(qman.used(&CopierId::from("a")), Some(size));
    assert_eq!(qman.used(&CopierId::from("b")), Some(size));
}

#[tokio::test]
async fn failed_destination_is_evicted_from_later_placements() {
    let (mem_a, mem_c) = (MemStore::new(), MemStore::new());
    let qman = Arc::new(QuotaManager::new());
    qman.add_res(mem_copier("a", &mem_a));
    qman.add_res(failing_copier("b", "disk gone"));
    qman.add_res(mem_copier("c", &mem_c));

    let striper = Arc::new(StripeConfig {
        distinct: 0,
        min: 2,
    });
    let sp = StripeProc::new(striper, Arc::clone(&qman)).await.unwrap();

    // first placement lands on a and b; b fails
    let chunk1 = chunk_of(b"first".to_vec());
    let err = drive(&sp, &chunk1).await;
    assert_eq!(err, Some(ProcError::other("disk gone")));

    let live: Vec<String> = qman
        .resources(0)
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(live, vec!["a", "c"]);

    // a later placement no longer sees b
    let chunk2 = chunk_of(b"second".to_vec());
    assert!(drive(&sp, &chunk2).await.is_none());
    assert!(mem_a.get(chunk2.hash()).is_some());
    assert!(mem_c.get(chunk2.hash()).is_some());
}

#[tokio::test]
async fn group_shares_one_charge_per_destination() {
    let (mem_a, mem_b) = (MemStore::new(), MemStore::new());
    let qman = Arc::new(QuotaManager::new());
    qman.add_res_quota(mem_copier("a", &mem_a), 2);
    qman.add_res_quota(mem_copier("b", &mem_b), 4);

    let striper = Arc::new(StripeConfig {
        distinct: 0,
        min: 1,
    });
    let sp = StripeProc::new(striper, Arc::clone(&qman)).await.unwrap();

    let chunk1 = chunk_of(vec![1u8; 2]);
    let chunk2 = chunk_of(vec![2u8; 1]);
    let mut carrier = Chunk::with_data(Data::from(Vec::new()));
    carrier
        .meta_mut()
        .set_group(vec![chunk1.clone(), chunk2.clone()]);

    // data_use is 3: only b admits the whole group
    assert!(drive(&sp, &carrier).await.is_none());
    assert!(mem_b.get(chunk1.hash()).is_some());
    assert!(mem_b.get(chunk2.hash()).is_some());
    assert!(mem_a.is_empty());
    assert_eq!(qman.used(&CopierId::from("b")), Some(3));
}

#[tokio::test]
async fn round_robin_spreads_placements_evenly() {
    let stores: Vec<MemStore> = (0..3).map(|_| MemStore::new()).collect();
    let qman = Arc::new(QuotaManager::new());
    for (store, id) in stores.iter().zip(["a", "b", "c"]) {
        qman.add_res(mem_copier(id, store));
    }

    let striper = Arc::new(StripeConfig {
        distinct: 0,
        min: 1,
    });
    let sp = StripeProc::new(striper, qman).await.unwrap();

    for i in 0..6u8 {
        let chunk = chunk_of(vec![i; 10]);
        assert!(drive(&sp, &chunk).await.is_none());
    }

    let counts: Vec<usize> = stores.iter().map(MemStore::len).collect();
    let max = counts.iter().max().unwrap();
    let min = counts.iter().min().unwrap();
    assert!(max - min <= 1, "unfair spread: {counts:?}");
}

#[tokio::test]
async fn placements_for_one_hash_are_serialized() {
    let (mem_a, mem_b) = (MemStore::new(), MemStore::new());
    let qman = Arc::new(QuotaManager::new());
    qman.add_res(mem_copier("a", &mem_a));
    qman.add_res(mem_copier("b", &mem_b));

    let striper = Arc::new(StripeConfig {
        distinct: 0,
        min: 2,
    });
    let sp = Arc::new(
        StripeProc::new(striper, Arc::clone(&qman)).await.unwrap(),
    );

    let chunk = chunk_of(b"contended".to_vec());
    let procs1 = sp.procs(&chunk).await.unwrap();

    // a second placement for the same content must wait for the first to
    // settle
    let second = {
        let sp = Arc::clone(&sp);
        let chunk = chunk.clone();
        tokio::spawn(async move { sp.procs(&chunk).await.unwrap() })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!second.is_finished());

    let mut first_err = None;
    for proc in procs1 {
        let (_, err) = read_chunks(proc.process(chunk.clone()).await).await;
        if first_err.is_none() {
            first_err = err;
        }
    }
    assert!(first_err.is_none());

    // the first placement settled; the second sees min already met and
    // plans no copies
    let procs2 = second.await.unwrap();
    assert_eq!(procs2.len(), 1);
    let size = chunk.data().size().unwrap();
    assert_eq!(qman.used(&CopierId::from("a")), Some(size));
    assert_eq!(qman.used(&CopierId::from("b")), Some(size));
}

#[tokio::test]
async fn infeasible_placement_is_reported_without_dispatch() {
    let mem_a = MemStore::new();
    let qman = Arc::new(QuotaManager::new());
    qman.add_res(mem_copier("a", &mem_a));

    let striper = Arc::new(StripeConfig {
        distinct: 0,
        min: 2,
    });
    let sp = StripeProc::new(striper, qman).await.unwrap();

    let chunk = chunk_of(b"lonely".to_vec());
    let err = sp.procs(&chunk).await.unwrap_err();
    match err {
        StoreError::Short(short) => {
            assert_eq!(short.min, 2);
            assert_eq!(short.avail, 1);
        }
        other => panic!("expected short placement, got {other:?}"),
    }
    assert!(mem_a.is_empty());
}

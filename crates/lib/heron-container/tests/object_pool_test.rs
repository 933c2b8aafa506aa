use heron_container::{define_handle, Handle, ObjectPool};

define_handle!(struct TestHandle, salt = 0x7A);

#[derive(Debug, PartialEq)]
struct HotData(u32);

#[derive(Debug, PartialEq)]
struct ColdData(String);

#[test]
pub fn test_store_and_lookup() {
    let mut pool: ObjectPool<TestHandle, HotData, ColdData> = ObjectPool::new(16);

    let a = pool.store(HotData(1), ColdData("a".into()));
    let b = pool.store(HotData(2), ColdData("b".into()));

    assert!(a.is_valid());
    assert_ne!(a, b);

    assert_eq!(&HotData(1), pool.get_hot(a));
    assert_eq!(&ColdData("b".into()), pool.get_cold(b));

    pool.get_hot_mut(a).0 = 10;
    assert_eq!(&HotData(10), pool.get_hot(a));
}

#[test]
#[should_panic]
pub fn test_stale_handle_asserts_after_remove() {
    let mut pool: ObjectPool<TestHandle, HotData, ColdData> = ObjectPool::new(16);

    let a = pool.store(HotData(1), ColdData("a".into()));
    pool.remove(a);

    // Slot generation was bumped, the original bits must not resolve anymore.
    let _ = pool.get_hot(a);
}

#[test]
pub fn test_generation_bump_on_slot_reuse() {
    let mut pool: ObjectPool<TestHandle, HotData, ColdData> = ObjectPool::new(4);

    let a = pool.store(HotData(1), ColdData("a".into()));
    pool.remove(a);

    let b = pool.store(HotData(2), ColdData("b".into()));
    assert_eq!(a.index(), b.index());
    assert_ne!(a.generation(), b.generation());
    assert_eq!(&HotData(2), pool.get_hot(b));
}

#[test]
pub fn test_capacity_exhaustion_returns_invalid() {
    let mut pool: ObjectPool<TestHandle, HotData, ColdData> = ObjectPool::new(2);

    let a = pool.store(HotData(1), ColdData("a".into()));
    let b = pool.store(HotData(2), ColdData("b".into()));
    let c = pool.store(HotData(3), ColdData("c".into()));

    assert!(!c.is_valid());

    // Stored data survives the failed store.
    assert_eq!(&HotData(1), pool.get_hot(a));
    assert_eq!(&HotData(2), pool.get_hot(b));
}

#[test]
#[should_panic]
pub fn test_invalid_handle_asserts() {
    let pool: ObjectPool<TestHandle, HotData, ColdData> = ObjectPool::new(2);
    let _ = pool.get_hot(TestHandle::INVALID);
}

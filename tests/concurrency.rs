use geocache::{
    Area, CacheBuilder, DispatchMode, FullSyncSnapshot, GeoLocation, GeoLocationCache,
    ObjectClass, TrackedObject,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

const OBJECTS: u64 = 200;
const ROUNDS: usize = 50;

fn object(id: u64, lat: f64, lon: f64) -> TrackedObject {
    TrackedObject::new(id, ObjectClass::MobileDevice, format!("dev-{}", id), GeoLocation::gps(lat, lon))
}

fn initial() -> FullSyncSnapshot {
    (0..OBJECTS)
        .map(|id| object(id, -60.0 + id as f64 * 0.5, -170.0 + id as f64 * 1.5))
        .collect()
}

/// One writer keeps moving, removing and re-adding objects while readers
/// check that store and index never disagree.
fn stress(cache: Arc<GeoLocationCache>) {
    cache.bulk_load(initial());
    let done = Arc::new(AtomicBool::new(false));
    let checks = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let cache = cache.clone();
            let done = done.clone();
            let checks = checks.clone();
            thread::spawn(move || {
                let area = match r % 2 {
                    0 => Area::world(),
                    _ => Area::new(-30.0, -100.0, 30.0, 100.0),
                };
                while !done.load(Ordering::Acquire) {
                    let stats = cache.stats();
                    assert_eq!(
                        stats.objects, stats.indexed,
                        "store and index sizes diverged"
                    );

                    for obj in cache.objects_in(&area) {
                        assert!(
                            area.contains_location(&obj.location),
                            "object {} returned for area but stored at {:?}",
                            obj.id,
                            obj.location
                        );
                    }
                    checks.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writer = {
        let cache = cache.clone();
        thread::spawn(move || {
            for round in 0..ROUNDS {
                let shift = round as f64 * 0.37;
                for id in 0..OBJECTS {
                    let lat = ((id as f64 * 0.9 + shift) % 160.0) - 80.0;
                    let lon = ((id as f64 * 2.3 + shift * 3.0) % 340.0) - 170.0;
                    if (id + round as u64) % 7 == 0 {
                        cache.apply_change(object(id, 0.0, 0.0).with_location(GeoLocation::unset()));
                    } else {
                        cache.apply_change(object(id, lat, lon));
                    }
                }
                if round % 10 == 9 {
                    cache.bulk_load(initial());
                }
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(checks.load(Ordering::Relaxed) > 0);
    let stats = cache.stats();
    assert_eq!(stats.objects, stats.indexed);
}

#[test]
fn test_readers_never_see_torn_updates() {
    stress(Arc::new(GeoLocationCache::new()));
}

#[test]
fn test_readers_never_see_torn_updates_with_small_leaves() {
    let cache = CacheBuilder::new()
        .node_capacity(2)
        .max_depth(8)
        .build()
        .unwrap();
    stress(Arc::new(cache));
}

#[test]
fn test_under_lock_listener_sees_applied_state() {
    let cache = Arc::new(
        CacheBuilder::new()
            .dispatch_mode(DispatchMode::UnderLock)
            .build()
            .unwrap(),
    );
    cache.bulk_load(FullSyncSnapshot::default());

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    cache.subscribe(Arc::new(move |obj: &TrackedObject, _: Option<&GeoLocation>| {
        assert!(obj.location.is_set());
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let writers: Vec<_> = (0..4u64)
        .map(|w| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..50u64 {
                    let id = w * 1_000 + i;
                    cache.apply_change(object(id, w as f64, i as f64));
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(notified.load(Ordering::SeqCst), 200);
    assert_eq!(cache.len(), 200);
}

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
};

use tracing_test::traced_test;
use wiring::{Config, Container, Inject};

const THREADS: usize = 16;

struct Pool;
struct Handle(Arc<Pool>, usize);
struct Session(Arc<Pool>);

fn container(created: &Arc<AtomicUsize>) -> Container {
    let container = Container::new();
    container
        .register_factory({
            let created = created.clone();
            move || {
                created.fetch_add(1, Ordering::SeqCst);
                Ok(Pool)
            }
        })
        .unwrap();
    container
        .register_factory_with(
            {
                let counter = AtomicUsize::new(0);
                move |Inject(pool): Inject<Pool>| Ok(Handle(pool, counter.fetch_add(1, Ordering::SeqCst)))
            },
            Config::transient(),
        )
        .unwrap();
    container
        .register_factory_with(
            {
                let created = created.clone();
                move |Inject(pool): Inject<Pool>| {
                    created.fetch_add(1, Ordering::SeqCst);
                    Ok(Session(pool))
                }
            },
            Config::scoped(),
        )
        .unwrap();
    container.build().unwrap();
    container
}

#[test]
#[traced_test]
fn test_singleton_identity_across_threads() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = container(&created);
    let expected = container.get::<Pool>().unwrap();
    let barrier = Barrier::new(THREADS);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                barrier.wait();
                let pool = container.get::<Pool>().unwrap();
                assert!(Arc::ptr_eq(&pool, &expected));
            });
        }
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
#[traced_test]
fn test_transient_distinct_across_threads() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = container(&created);
    let barrier = Barrier::new(THREADS);

    let handles: Vec<Arc<Handle>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    container.get::<Handle>().unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    let ids: HashSet<usize> = handles.iter().map(|handle| handle.1).collect();
    assert_eq!(ids.len(), THREADS);
    for (index, handle) in handles.iter().enumerate() {
        assert!(handles[index + 1..].iter().all(|other| !Arc::ptr_eq(handle, other)));
        assert!(Arc::ptr_eq(&handle.0, &handles[0].0));
    }
}

#[test]
#[traced_test]
fn test_scoped_constructed_once_per_scope() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = container(&created);
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let first = container.create_scope().unwrap();
    let second = container.create_scope().unwrap();
    let barrier = Barrier::new(THREADS);

    let sessions: Vec<(bool, Arc<Session>)> = thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|index| {
                let (first, second, barrier) = (&first, &second, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    if index % 2 == 0 {
                        (true, first.get::<Session>().unwrap())
                    } else {
                        (false, second.get::<Session>().unwrap())
                    }
                })
            })
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    // One pool plus one session per scope
    assert_eq!(created.load(Ordering::SeqCst), 3);

    let from_first = first.get::<Session>().unwrap();
    let from_second = second.get::<Session>().unwrap();
    assert!(!Arc::ptr_eq(&from_first, &from_second));
    for (in_first, session) in &sessions {
        let expected = if *in_first { &from_first } else { &from_second };
        assert!(Arc::ptr_eq(session, expected));
    }
}

#[test]
#[traced_test]
fn test_dispose_while_resolving() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = container(&created);
    let scope = container.create_scope().unwrap();
    let barrier = Barrier::new(THREADS + 1);

    thread::scope(|threads| {
        for _ in 0..THREADS {
            threads.spawn(|| {
                barrier.wait();
                // Either resolved before disposal or rejected after it
                let _ = scope.get::<Session>();
            });
        }
        barrier.wait();
        scope.dispose();
    });

    assert!(scope.is_disposed());
    assert!(scope.get::<Session>().is_err());
    assert!(created.load(Ordering::SeqCst) <= 2);
}

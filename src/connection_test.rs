use super::*;

// =============================================================================
// allow / release
// =============================================================================

#[test]
fn allows_up_to_max_per_user() {
    let cl = ConnectionLimiter::new(3);

    assert!(cl.allow("user1"));
    assert!(cl.allow("user1"));
    assert!(cl.allow("user1"));
    assert!(!cl.allow("user1"));

    // A different identity has its own quota.
    assert!(cl.allow("user2"));
}

#[test]
fn release_frees_a_slot() {
    let cl = ConnectionLimiter::new(2);

    assert!(cl.allow("user1"));
    assert!(cl.allow("user1"));
    assert!(!cl.allow("user1"));

    cl.release("user1");
    assert!(cl.allow("user1"));
    assert!(!cl.allow("user1"));
}

#[test]
fn release_unknown_key_is_noop() {
    let cl = ConnectionLimiter::new(2);

    cl.release("never-seen");
    assert_eq!(cl.count("never-seen"), 0);

    // The no-op release must not have created a negative balance.
    assert!(cl.allow("never-seen"));
    assert!(cl.allow("never-seen"));
    assert!(!cl.allow("never-seen"));
}

#[test]
fn zero_max_rejects_everything() {
    let cl = ConnectionLimiter::new(0);

    assert!(!cl.allow("user1"));
    assert_eq!(cl.count("user1"), 0);
}

// =============================================================================
// count
// =============================================================================

#[test]
fn count_tracks_net_admits() {
    let cl = ConnectionLimiter::new(5);

    assert_eq!(cl.count("user1"), 0);

    cl.allow("user1");
    assert_eq!(cl.count("user1"), 1);

    cl.allow("user1");
    assert_eq!(cl.count("user1"), 2);

    cl.release("user1");
    assert_eq!(cl.count("user1"), 1);
}

#[test]
fn refused_allow_does_not_change_count() {
    let cl = ConnectionLimiter::new(1);

    assert!(cl.allow("user1"));
    assert!(!cl.allow("user1"));
    assert_eq!(cl.count("user1"), 1);
}

#[test]
fn release_to_zero_removes_key() {
    let cl = ConnectionLimiter::new(2);

    cl.allow("user1");
    cl.release("user1");
    assert_eq!(cl.count("user1"), 0);

    let connections = cl.connections.read().unwrap();
    assert!(!connections.contains_key("user1"));
}

// =============================================================================
// concurrency
// =============================================================================

#[test]
fn concurrent_allow_admits_exactly_max() {
    let cl = ConnectionLimiter::new(50);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let cl = cl.clone();
        handles.push(std::thread::spawn(move || {
            let mut admitted = 0;
            for _ in 0..10 {
                if cl.allow("user1") {
                    admitted += 1;
                }
            }
            admitted
        }));
    }

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 50);
    assert_eq!(cl.count("user1"), 50);
}

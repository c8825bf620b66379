//! Integration Tests for the Reactive Engine
//!
//! These tests verify that observables, computed values and reactions work
//! together through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vigil_core::{Computed, Observable, ReactiveError, Runtime};

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// A reaction that only reads A never re-runs when only B is written.
#[test]
fn reactions_are_selective() {
    let rt = Runtime::new();
    let a = rt.cell(1);
    let b = rt.cell(1);
    let runs = counter();

    let _reader = {
        let (a, runs) = (a.clone(), runs.clone());
        rt.autorun(move || {
            a.get();
            runs.set(runs.get() + 1);
        })
    };

    for value in 2..10 {
        b.set(value).unwrap();
    }
    assert_eq!(runs.get(), 1);
    assert_eq!(b.subscriber_count(), 0);

    a.set(2).unwrap();
    assert_eq!(runs.get(), 2);
}

/// Writing the value a cell already holds invalidates nothing.
#[test]
fn equal_writes_are_suppressed() {
    let rt = Runtime::new();
    let currency = rt.cell("eur".to_string());
    let computes = counter();
    let runs = counter();

    let upper = {
        let (currency, computes) = (currency.clone(), computes.clone());
        rt.computed(move || {
            computes.set(computes.get() + 1);
            Ok(currency.get().to_uppercase())
        })
    };
    let _reader = {
        let (upper, runs) = (upper.clone(), runs.clone());
        rt.try_autorun(move || {
            upper.get()?;
            runs.set(runs.get() + 1);
            Ok(())
        })
    };

    assert!(!currency.set("eur".into()).unwrap());
    assert!(!upper.is_dirty());
    assert_eq!(computes.get(), 1);
    assert_eq!(runs.get(), 1);
}

/// N writes to N cells inside one transaction cause one run, after all of
/// them committed.
#[test]
fn transaction_batches_writes() {
    let rt = Runtime::new();
    let cells: Vec<Observable<i32>> = (0..5).map(|_| rt.cell(0)).collect();
    let sums: Rc<RefCell<Vec<i32>>> = Rc::default();

    let _sum = {
        let (cells, sums) = (cells.clone(), sums.clone());
        rt.autorun(move || {
            let total: i32 = cells.iter().map(Observable::get).sum();
            sums.borrow_mut().push(total);
        })
    };

    rt.transaction(|| {
        for (i, cell) in cells.iter().enumerate() {
            cell.set(i as i32 + 1).unwrap();
        }
        // nothing runs while the batch is open
        assert_eq!(sums.borrow().len(), 1);
    });

    assert_eq!(*sums.borrow(), vec![0, 15]);
}

/// Nested transactions drain only when the outermost one ends.
#[test]
fn nested_transactions_drain_once() {
    let rt = Runtime::new();
    let value = rt.cell(0);
    let runs = counter();

    let _reader = {
        let (value, runs) = (value.clone(), runs.clone());
        rt.autorun(move || {
            value.get();
            runs.set(runs.get() + 1);
        })
    };

    rt.transaction(|| {
        value.set(1).unwrap();
        rt.transaction(|| value.set(2).unwrap());
        assert_eq!(runs.get(), 1);
        rt.run_in_action(|| value.set(3).unwrap());
        assert_eq!(runs.get(), 1);
    });
    assert_eq!(runs.get(), 2);
}

/// The computed function runs once between invalidating writes, however
/// often it is read.
#[test]
fn computed_is_lazy_and_memoized() {
    let rt = Runtime::new();
    let base = rt.cell(2);
    let calls = counter();

    let squared = {
        let (base, calls) = (base.clone(), calls.clone());
        rt.computed(move || {
            calls.set(calls.get() + 1);
            Ok(base.get() * base.get())
        })
    };
    assert_eq!(calls.get(), 0);

    for _ in 0..4 {
        assert_eq!(squared.get().unwrap(), 4);
    }
    assert_eq!(calls.get(), 1);

    base.set(3).unwrap();
    base.set(4).unwrap();
    assert_eq!(calls.get(), 1);

    for _ in 0..4 {
        assert_eq!(squared.get().unwrap(), 16);
    }
    assert_eq!(calls.get(), 2);
}

/// Flipping a branch moves the dependency from X to Y.
#[test]
fn dependencies_follow_branches() {
    let rt = Runtime::new();
    let use_x = rt.cell(true);
    let x = rt.cell(1);
    let y = rt.cell(10);
    let calls = counter();

    let pick = {
        let (use_x, x, y, calls) = (use_x.clone(), x.clone(), y.clone(), calls.clone());
        rt.computed(move || {
            calls.set(calls.get() + 1);
            Ok(if use_x.get() { x.get() } else { y.get() })
        })
    };
    let _reader = {
        let pick = pick.clone();
        rt.try_autorun(move || pick.get().map(drop))
    };
    assert_eq!(calls.get(), 1);

    use_x.set(false).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(x.subscriber_count(), 0);

    x.set(2).unwrap();
    assert_eq!(calls.get(), 2);
    assert!(!pick.is_dirty());

    y.set(20).unwrap();
    assert_eq!(calls.get(), 3);
    assert_eq!(pick.get().unwrap(), 20);
}

/// A computed that reads itself fails instead of recursing.
#[test]
fn self_reading_computed_is_a_cycle() {
    let rt = Runtime::new();
    let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::default();

    let looping = {
        let slot = slot.clone();
        rt.computed(move || {
            let me = slot.borrow().clone();
            match me {
                Some(me) => Ok(me.get()? + 1),
                None => Ok(0),
            }
        })
    };
    *slot.borrow_mut() = Some(looping.clone());

    let err = looping.get().unwrap_err();
    assert!(err.is_cycle());
    assert!(looping.is_dirty());

    // break the handle cycle so the runtime can be freed
    slot.borrow_mut().take();
}

/// Cycles through a second computed are caught too.
#[test]
fn transitive_cycle_is_detected() {
    let rt = Runtime::new();
    let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::default();

    let first = {
        let slot = slot.clone();
        rt.computed(move || {
            let second = slot.borrow().clone();
            match second {
                Some(second) => second.get(),
                None => Ok(0),
            }
        })
    };
    let second = {
        let first = first.clone();
        rt.computed(move || first.get())
    };
    *slot.borrow_mut() = Some(second);

    assert_eq!(first.get().unwrap_err(), ReactiveError::Cycle { node: first.id() });
    slot.borrow_mut().take();
}

/// After disposal, writes to former dependencies never run the reaction.
#[test]
fn disposed_reaction_never_runs() {
    let rt = Runtime::new();
    let a = rt.cell(0);
    let b = rt.cell(0);
    let runs = counter();

    let disposer = {
        let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
        rt.autorun(move || {
            a.get();
            b.get();
            runs.set(runs.get() + 1);
        })
    };

    disposer.dispose();
    a.set(1).unwrap();
    b.set(1).unwrap();
    rt.transaction(|| a.set(2).unwrap());

    assert_eq!(runs.get(), 1);
    assert_eq!(a.subscriber_count(), 0);
    assert_eq!(b.subscriber_count(), 0);
}

/// price=100, rate=1.12: total is 112. Writing price=200 and the same rate
/// in one transaction recomputes total once, to 224, and its reaction
/// runs once.
#[test]
fn price_and_rate_scenario() {
    let rt = Runtime::new();
    let price = rt.cell(100.0);
    let rate = rt.cell(1.12);
    let computes = counter();
    let seen: Rc<RefCell<Vec<f64>>> = Rc::default();

    let total = {
        let (price, rate, computes) = (price.clone(), rate.clone(), computes.clone());
        rt.computed(move || {
            computes.set(computes.get() + 1);
            Ok(price.get() * rate.get())
        })
    };
    assert!(close(total.get().unwrap(), 112.0));

    let _render = {
        let (total, seen) = (total.clone(), seen.clone());
        rt.try_autorun(move || {
            seen.borrow_mut().push(total.get()?);
            Ok(())
        })
    };
    assert_eq!(computes.get(), 1);

    rt.transaction(|| {
        price.set(200.0).unwrap();
        rate.set(1.12).unwrap();
    });

    assert_eq!(computes.get(), 2);
    assert_eq!(seen.borrow().len(), 2);
    assert!(close(seen.borrow()[1], 224.0));
    assert!(close(total.get().unwrap(), 224.0));
    assert_eq!(computes.get(), 2);
}

/// Failing reactions are reported, do not stop siblings, and run again on
/// their next invalidation.
#[test]
fn reaction_failures_are_isolated() {
    let rt = Runtime::new();
    let failures = counter();
    {
        let failures = failures.clone();
        rt.on_reaction_error(move |_| failures.set(failures.get() + 1));
    }

    let value = rt.cell(0);
    let attempts = counter();
    let sibling_runs = counter();

    let _failing = {
        let (value, attempts) = (value.clone(), attempts.clone());
        rt.try_autorun(move || {
            attempts.set(attempts.get() + 1);
            match value.get() {
                1 => Err(ReactiveError::reaction("rejected")),
                _ => Ok(()),
            }
        })
    };
    let _sibling = {
        let (value, runs) = (value.clone(), sibling_runs.clone());
        rt.autorun(move || {
            value.get();
            runs.set(runs.get() + 1);
        })
    };

    value.set(1).unwrap();
    assert_eq!(failures.get(), 1);
    assert_eq!(sibling_runs.get(), 2);

    value.set(2).unwrap();
    assert_eq!(attempts.get(), 3);
    assert_eq!(failures.get(), 1);
}

/// Reads inside an action do not subscribe the surrounding reaction.
#[test]
fn actions_are_untracked() {
    let rt = Runtime::new();
    let watched = rt.cell(0);
    let hidden = rt.cell(0);
    let runs = counter();

    let _reader = {
        let (rt2, watched, hidden, runs) = (rt.clone(), watched.clone(), hidden.clone(), runs.clone());
        rt.autorun(move || {
            watched.get();
            rt2.run_in_action(|| hidden.get());
            runs.set(runs.get() + 1);
        })
    };

    hidden.set(1).unwrap();
    assert_eq!(runs.get(), 1);
    watched.set(1).unwrap();
    assert_eq!(runs.get(), 2);
}

/// Dropping every handle empties the arena.
#[test]
fn handles_release_their_nodes() {
    let rt = Runtime::new();
    {
        let a = rt.cell(1);
        let doubled = {
            let a = a.clone();
            rt.computed(move || Ok(a.get() * 2))
        };
        assert_eq!(doubled.get().unwrap(), 2);
        assert_eq!(rt.node_count(), 2);
    }
    assert_eq!(rt.node_count(), 0);

    let list = rt.list([1, 2, 3]);
    assert!(rt.node_count() > 0);
    drop(list);
    assert_eq!(rt.node_count(), 0);
}

mod common;

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread;

use vkrestore::object::*;
use vkrestore::{IdCounter, Reference, Registry, StateTracker};

use common::{buffer_info, init_logs};

const OBJECTS: u64 = 256;
const OPS: usize = 1024;
const THREADS: u64 = 8;

#[derive(Debug, Clone, Copy)]
enum Op {
    /// Take another strong reference through a registry lookup.
    Acquire(u64),
    /// Drop one extra reference, if any.
    Release(u64),
    /// Drop every owner of the object.
    Destroy(u64),
    /// Re-create the object if it is gone.
    Create(u64),
}

impl Op {
    fn object(&self) -> u64 {
        match *self {
            Op::Acquire(i) | Op::Release(i) | Op::Destroy(i) | Op::Create(i) => i,
        }
    }
}

type Ref = Reference<String, u64>;

#[derive(Default)]
struct Owners {
    base: HashMap<u64, Ref>,
    extra: HashMap<u64, Vec<Ref>>,
}

impl Owners {
    fn run(&mut self, reg: &Registry<String, u64>, op: Op) -> Result<()> {
        match op {
            Op::Acquire(i) => {
                if let Some(r) = reg.get(&i) {
                    self.extra.entry(i).or_default().push(r);
                }
            }
            Op::Release(i) => {
                if let Some(v) = self.extra.get_mut(&i) {
                    v.pop();
                }
            }
            Op::Destroy(i) => {
                self.base.remove(&i);
                self.extra.remove(&i);
                assert!(!reg.contains(&i), "object {} outlived its owners", i);
            }
            Op::Create(i) => {
                if !self.base.contains_key(&i) {
                    self.extra.remove(&i);
                    let r = reg.new_ref_with_id(i, format!("object-{}", i))?;
                    self.base.insert(i, r);
                }
            }
        }
        Ok(())
    }
}

fn generate(seed: u64) -> Vec<Op> {
    let mut rng = oorandom::Rand64::new(seed as u128);
    (0..OPS)
        .map(|_| {
            let i = rng.rand_range(0..OBJECTS);
            match rng.rand_range(0..10) {
                0..=3 => Op::Acquire(i),
                4..=6 => Op::Release(i),
                7 => Op::Destroy(i),
                _ => Op::Create(i),
            }
        })
        .collect()
}

fn populate(reg: &Registry<String, u64>) -> Result<Vec<Owners>> {
    let mut parts: Vec<Owners> = (0..THREADS).map(|_| Owners::default()).collect();
    for i in 0..OBJECTS {
        let r = reg.new_ref_with_id(i, format!("object-{}", i))?;
        parts[(i % THREADS) as usize].base.insert(i, r);
    }
    Ok(parts)
}

/// Strong owners per live object, not counting the lookup itself.
fn ref_counts(reg: &Registry<String, u64>) -> BTreeMap<u64, usize> {
    (0..OBJECTS)
        .filter_map(|i| reg.get(&i).map(|r| (i, r.ref_count() - 1)))
        .collect()
}

#[test]
fn concurrent_and_sequential_runs_agree_on_ref_counts() -> Result<()> {
    init_logs();
    let ops = generate(0x5eed_cafe);

    // sequential
    let seq_reg: Registry<String, u64> = Registry::with_counter(Arc::new(IdCounter::new()));
    let mut seq_parts = populate(&seq_reg)?;
    for op in &ops {
        seq_parts[(op.object() % THREADS) as usize].run(&seq_reg, *op)?;
    }
    let sequential = ref_counts(&seq_reg);

    // concurrent: each object's operations stay on one thread, in order
    let par_reg: Registry<String, u64> = Registry::with_counter(Arc::new(IdCounter::new()));
    let parts = populate(&par_reg)?;
    let par_parts: Vec<Owners> = thread::scope(|s| {
        let handles: Vec<_> = parts
            .into_iter()
            .enumerate()
            .map(|(t, mut owners)| {
                let reg = &par_reg;
                let ops = &ops;
                s.spawn(move || -> Result<Owners> {
                    for op in ops.iter().filter(|op| op.object() % THREADS == t as u64) {
                        owners.run(reg, *op)?;
                    }
                    Ok(owners)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect::<Result<Vec<_>>>()
    })?;
    let concurrent = ref_counts(&par_reg);

    assert_eq!(sequential, concurrent);
    assert_eq!(seq_reg.len(), par_reg.len());

    // every surviving count is explained by the owners still held
    for (i, n) in &concurrent {
        let part = &par_parts[(*i % THREADS) as usize];
        let held = part.base.contains_key(i) as usize
            + part.extra.get(i).map(|v| v.len()).unwrap_or(0);
        assert_eq!(*n, held, "object {}", i);
    }

    drop(par_parts);
    drop(seq_parts);
    assert!(par_reg.is_empty());
    assert!(seq_reg.is_empty());
    Ok(())
}

#[test]
fn enumerate_during_churn_sees_whole_entries() -> Result<()> {
    init_logs();
    let reg: Registry<String, u64> = Registry::with_counter(Arc::new(IdCounter::new()));
    let stable: Vec<Ref> = (0..64)
        .map(|i| reg.new_ref_with_id(i, format!("stable-{}", i)))
        .collect::<vkrestore::Result<_>>()?;

    thread::scope(|s| {
        for t in 0..4u64 {
            let reg = &reg;
            s.spawn(move || {
                for round in 0..200u64 {
                    let id = 1_000 + t * 1_000 + round;
                    let r = reg.new_ref_with_id(id, format!("churn-{}", id)).unwrap();
                    drop(r);
                }
            });
        }
        for _ in 0..50 {
            let mut seen = 0;
            reg.enumerate(|r| {
                assert!(!r.payload().is_empty());
                if r.id() < 64 {
                    seen += 1;
                }
            });
            assert_eq!(seen, 64);
        }
    });

    assert_eq!(reg.len(), stable.len());
    Ok(())
}

#[test]
fn trackers_stay_consistent_under_parallel_create_destroy() -> Result<()> {
    init_logs();
    let t = StateTracker::new();
    let instance = Identity::root(ObjectKind::Instance, 0x1);
    t.on_create(None, instance, CreateInfo::Instance(InstanceInfo::default()))?;
    let physical = Identity::child_of(ObjectKind::PhysicalDevice, 0x2, &instance);
    t.on_create(
        Some(instance),
        physical,
        CreateInfo::PhysicalDevice(PhysicalDeviceInfo::default()),
    )?;
    let device = Identity::child_of(ObjectKind::Device, 0x3, &physical);
    t.on_create(
        Some(physical),
        device,
        CreateInfo::Device(DeviceInfo {
            queue_infos: vec![],
            enabled_extensions: vec![],
            next: None,
        }),
    )?;

    thread::scope(|s| {
        for worker in 0..THREADS {
            let t = &t;
            s.spawn(move || {
                for k in 0..64u64 {
                    let id = Identity::child_of(ObjectKind::Buffer, 0x1000 * (worker + 1) + k, &device);
                    t.on_create(Some(device), id, CreateInfo::Buffer(buffer_info(256)))
                        .unwrap();
                    if k % 2 == 1 {
                        t.on_destroy(&id).unwrap();
                    }
                }
            });
        }
    });

    let dev = t.require(&device)?;
    let buffers = dev.child_tracker(ObjectKind::Buffer).unwrap();
    assert_eq!(buffers.len(), (THREADS * 32) as usize);
    buffers.enumerate(|r| {
        assert!(r.is_active());
        assert_eq!(r.id().handle % 2, 0);
    });
    Ok(())
}

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module implements the response bin itself: one reentrant guard over
//! three mutually consistent indices, plus capacity- and age-based shedding

use super::{ItemRecord, DEFAULT_ITEM_LIFETIME_MS};
use crate::errors::BinError;
use crate::types::{OriginId, Payload, RequestId};
use log::{debug, info};
#[cfg(feature = "runtime_metrics")]
use log::{error, warn};

use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
#[cfg(feature = "runtime_metrics")]
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The indices of the bin, only ever touched with the guard held.
///
/// `items` owns every resident payload; `origins` maps each origin with at
/// least one live record to that origin's outstanding request numbers;
/// `age` orders live request identifiers by insertion ticket. Every mutation
/// updates all three together.
struct BinInner<P> {
    items: HashMap<RequestId, ItemRecord<P>>,
    origins: HashMap<OriginId, HashSet<u64>>,
    age: BTreeMap<u64, RequestId>,
    next_ticket: u64,
    total_bytes: usize,
}

impl<P> BinInner<P> {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            origins: HashMap::new(),
            age: BTreeMap::new(),
            next_ticket: 0,
            total_bytes: 0,
        }
    }

    /// Remove one record from all three indices, retiring the origin bucket
    /// if it becomes empty. Returns the record, ownership included.
    fn remove(&mut self, request_id: &RequestId) -> Option<ItemRecord<P>> {
        let record = self.items.remove(request_id)?;
        self.age.remove(&record.ticket);
        if let Some(bucket) = self.origins.get_mut(&request_id.origin) {
            bucket.remove(&request_id.request_number);
            if bucket.is_empty() {
                self.origins.remove(&request_id.origin);
            }
        }
        self.total_bytes -= record.weight;
        Some(record)
    }

    /// Remove and return the oldest record (lowest ticket), if any
    fn pop_oldest(&mut self) -> Option<(RequestId, ItemRecord<P>)> {
        let request_id = self.age.values().next()?.clone();
        let record = self.remove(&request_id)?;
        Some((request_id, record))
    }
}

struct BinShared<P> {
    guard: ReentrantMutex<RefCell<BinInner<P>>>,
    capacity_bytes: Option<usize>,
    max_item_age: Duration,

    #[cfg(feature = "runtime_metrics")]
    delivered_count: AtomicU64,
    #[cfg(feature = "runtime_metrics")]
    evicted_count: AtomicU64,
    #[cfg(feature = "runtime_metrics")]
    decayed_count: AtomicU64,
}

/// A shared, concurrently accessed staging store for asynchronous request
/// results. Producers `add` payloads keyed by request identifier; consumers
/// remove them by exact identifier, by origin, or oldest-first. The bin sheds
/// the oldest records when a byte capacity is exceeded, and an external
/// periodic task is expected to call [`ResponseBin::sweep_decay`] to discard
/// records nobody ever collected.
///
/// Cloning the handle shares the same underlying bin.
pub struct ResponseBin<P> {
    shared: Arc<BinShared<P>>,
}

impl<P> Clone for ResponseBin<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: Payload> ResponseBin<P> {
    /// Create a new bin. You can supply an optional capacity in payload bytes
    /// (`None` = unbounded) and an optional item lifetime for the decay sweep
    /// or take the default (30s).
    pub fn new(o_capacity_bytes: Option<usize>, o_max_item_age: Option<Duration>) -> Self {
        let max_item_age = match o_max_item_age {
            Some(age) if age > Duration::from_millis(1) => age,
            _ => Duration::from_millis(DEFAULT_ITEM_LIFETIME_MS),
        };
        Self {
            shared: Arc::new(BinShared {
                guard: ReentrantMutex::new(RefCell::new(BinInner::new())),
                capacity_bytes: o_capacity_bytes,
                max_item_age,

                #[cfg(feature = "runtime_metrics")]
                delivered_count: AtomicU64::new(0),
                #[cfg(feature = "runtime_metrics")]
                evicted_count: AtomicU64::new(0),
                #[cfg(feature = "runtime_metrics")]
                decayed_count: AtomicU64::new(0),
            }),
        }
    }

    /// Stage a payload under a request identifier, taking ownership of it.
    ///
    /// Fails with [`BinError::DuplicateKey`] if the identifier already names
    /// a live record and with [`BinError::Oversized`] if the payload alone
    /// cannot fit under the capacity; in both cases the bin is unchanged and
    /// the rejected payload is dropped. Otherwise the payload is inserted and
    /// the oldest records are silently evicted until the aggregate weight is
    /// back under the capacity.
    pub fn add(&self, payload: P, request_id: RequestId) -> Result<(), BinError> {
        let guard = self.shared.guard.lock();
        let mut bin = guard.borrow_mut();

        if bin.items.contains_key(&request_id) {
            return Err(BinError::DuplicateKey(request_id));
        }

        let weight = payload.size_of();
        if let Some(capacity) = self.shared.capacity_bytes {
            // An oversized payload would be its own eviction victim; reject it
            // up front so the rest of the bin is untouched.
            if weight > capacity {
                return Err(BinError::Oversized { weight, capacity });
            }
        }

        let ticket = bin.next_ticket;
        bin.next_ticket += 1;
        bin.age.insert(ticket, request_id.clone());
        bin.origins
            .entry(request_id.origin.clone())
            .or_default()
            .insert(request_id.request_number);
        bin.items.insert(
            request_id,
            ItemRecord {
                ticket,
                inserted: Instant::now(),
                weight,
                payload,
            },
        );
        bin.total_bytes += weight;

        if let Some(capacity) = self.shared.capacity_bytes {
            while bin.total_bytes > capacity {
                match bin.pop_oldest() {
                    Some((victim_id, victim)) => {
                        debug!(
                            "Evicting record {:?} (type {}, {} bytes) to relieve memory pressure",
                            victim_id,
                            victim.payload.type_tag(),
                            victim.weight
                        );
                        #[cfg(feature = "runtime_metrics")]
                        self.shared.evicted_count.fetch_add(1, Ordering::Relaxed);
                    }
                    None => break,
                }
            }
        }

        Ok(())
    }

    /// Remove and return the oldest staged record together with its
    /// identifier, or `None` if the bin is empty
    pub fn acquire_any(&self) -> Option<(RequestId, P)> {
        let guard = self.shared.guard.lock();
        let mut bin = guard.borrow_mut();

        let (request_id, record) = bin.pop_oldest()?;

        #[cfg(feature = "runtime_metrics")]
        self.shared.delivered_count.fetch_add(1, Ordering::Relaxed);

        Some((request_id, record.payload))
    }

    /// Remove and return one record staged for the given origin, or `None`
    /// if that origin has no live records. The choice among the origin's
    /// records is arbitrary.
    pub fn acquire_for_origin(&self, origin: &OriginId) -> Option<(RequestId, P)> {
        let guard = self.shared.guard.lock();
        let mut bin = guard.borrow_mut();

        let request_number = *bin.origins.get(origin)?.iter().next()?;
        let request_id = RequestId::new(origin.clone(), request_number);
        let record = bin.remove(&request_id)?;

        #[cfg(feature = "runtime_metrics")]
        self.shared.delivered_count.fetch_add(1, Ordering::Relaxed);

        Some((request_id, record.payload))
    }

    /// Remove and return the exact record named by `request_id`, or `None`
    /// if it is absent (never added, already collected, evicted, or decayed)
    pub fn acquire_for_identifier(&self, request_id: &RequestId) -> Option<P> {
        let guard = self.shared.guard.lock();
        let record = guard.borrow_mut().remove(request_id)?;

        #[cfg(feature = "runtime_metrics")]
        self.shared.delivered_count.fetch_add(1, Ordering::Relaxed);

        Some(record.payload)
    }

    /// Number of live records
    pub fn count_items(&self) -> usize {
        let guard = self.shared.guard.lock();
        let count = guard.borrow().items.len();
        count
    }

    /// Number of distinct origins with at least one live record
    pub fn count_origins(&self) -> usize {
        let guard = self.shared.guard.lock();
        let count = guard.borrow().origins.len();
        count
    }

    /// Discard every record at least as old as the configured item lifetime.
    /// Intended to be driven by an external periodic task.
    pub fn sweep_decay(&self) {
        self.sweep_decay_older_than(self.shared.max_item_age)
    }

    /// Discard every record at least `max_age` old. `Duration::ZERO`
    /// performs an immediate, near-total purge.
    pub fn sweep_decay_older_than(&self, max_age: Duration) {
        let guard = self.shared.guard.lock();
        let mut bin = guard.borrow_mut();

        let now = Instant::now();
        let mut removed = 0u32;
        // Insertion times are monotone in ticket order, so the scan can stop
        // at the first record younger than the threshold.
        loop {
            let request_id = match bin.age.values().next() {
                Some(request_id) => request_id.clone(),
                None => break,
            };
            let inserted = match bin.items.get(&request_id) {
                Some(record) => record.inserted,
                None => break,
            };
            if now.duration_since(inserted) < max_age {
                break;
            }
            bin.remove(&request_id);
            removed += 1;
        }

        if removed > 0 {
            info!("Removed {} decayed records from the bin", removed);
            #[cfg(feature = "runtime_metrics")]
            self.shared
                .decayed_count
                .fetch_add(u64::from(removed), Ordering::Relaxed);
        }
    }

    /// Discard every record unconditionally
    pub fn flush(&self) {
        let guard = self.shared.guard.lock();
        let mut bin = guard.borrow_mut();

        let flushed = bin.items.len();
        bin.items.clear();
        bin.origins.clear();
        bin.age.clear();
        bin.total_bytes = 0;
        debug!("Flushed {} records from the bin", flushed);
    }

    /// Run `f` while holding the bin's guard, making the whole closure one
    /// atomic unit with respect to every other thread. The guard is
    /// reentrant, so `f` may freely call any of the bin's operations
    /// (including nested `with_exclusive`) without deadlocking.
    pub fn with_exclusive<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.shared.guard.lock();
        f(self)
    }

    /// Log delivery/eviction/decay counters accumulated since the last call
    pub fn log_metrics(&self, _level: log::Level) {
        #[cfg(feature = "runtime_metrics")]
        {
            let delivered = self.shared.delivered_count.swap(0, Ordering::Relaxed);
            let evicted = self.shared.evicted_count.swap(0, Ordering::Relaxed);
            let decayed = self.shared.decayed_count.swap(0, Ordering::Relaxed);
            let resident = self.count_items();

            let msg = format!(
                "Delivered since last: {delivered}, evicted: {evicted}, decayed: {decayed}, resident items: {resident}"
            );
            match _level {
                log::Level::Trace => println!("{msg}"),
                log::Level::Debug => debug!("{}", msg),
                log::Level::Info => info!("{}", msg),
                log::Level::Warn => warn!("{}", msg),
                _ => error!("{}", msg),
            }
        }
    }
}

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module handles the response bin: a memory-bounded, age-bounded store
//! correlating asynchronous request results with their eventual consumers

use std::time::Instant;


/// items live for 30s by default
pub(crate) const DEFAULT_ITEM_LIFETIME_MS: u64 = 30000;

/// One staged result. Tickets are assigned from a monotone counter under the
/// bin's guard, so ticket order is insertion order and breaks timestamp ties.
pub(crate) struct ItemRecord<P> {
    pub(crate) ticket: u64,
    pub(crate) inserted: Instant,
    pub(crate) weight: usize,
    pub(crate) payload: P,
}

// -------- sub modules -------- //

pub mod bin;

// -------- store exports -------- //

pub use bin::ResponseBin;

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Errors for bin operations.
//!
//! Misses on the `acquire_*` operations are not errors and are reported as
//! `None`; eviction and decay are internal resource management and are never
//! surfaced to any caller.

use crate::types::RequestId;
use core::fmt;

/// Reasons an `add` can be rejected. A rejected `add` leaves the bin exactly
/// as it was before the call.
#[derive(Debug, PartialEq, Eq)]
pub enum BinError {
    /// The identifier already names a live record
    DuplicateKey(RequestId),
    /// The payload alone cannot fit under the configured capacity, even with
    /// every other record evicted
    Oversized {
        /// Byte weight of the rejected payload
        weight: usize,
        /// Configured capacity of the bin, in bytes
        capacity: usize,
    },
}

impl fmt::Display for BinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(request_id) => {
                write!(f, "A live record already exists for request {request_id:?}")
            }
            Self::Oversized { weight, capacity } => {
                write!(
                    f,
                    "Payload of {weight} bytes cannot fit under the {capacity} byte capacity"
                )
            }
        }
    }
}

impl std::error::Error for BinError {}

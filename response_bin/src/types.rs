// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Identifier value types and the payload contract

use serde::{Deserialize, Serialize};

// ============================================
// Traits
// ============================================

/// Retrieve the in-memory size of a structure
pub trait SizeOf {
    /// Retrieve the in-memory size of a structure
    fn size_of(&self) -> usize;
}

/// The contract a stored value must satisfy. The bin treats payloads as
/// opaque: it charges their byte weight against its capacity and carries the
/// type tag through to debug logs, but never interprets their contents.
pub trait Payload: SizeOf + Send {
    /// A numeric tag identifying the payload's kind to the dispatch layer
    fn type_tag(&self) -> u32;
}

// ============================================
// Identifiers
// ============================================

/// Identifies one instance of a request-issuing endpoint. The nonce
/// disambiguates endpoint instances that share a name and process id
/// (e.g. across a restart).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginId {
    /// Logical name of the endpoint
    pub name: String,
    /// Operating-system process id of the endpoint instance
    pub process_id: u32,
    /// Sequence number of the endpoint instance within its process
    pub sequence: u64,
    /// Random value distinguishing otherwise identical instances
    pub nonce: u64,
}

impl OriginId {
    /// Construct an origin identifier
    pub fn new(name: impl Into<String>, process_id: u32, sequence: u64, nonce: u64) -> Self {
        Self {
            name: name.into(),
            process_id,
            sequence,
            nonce,
        }
    }
}

/// Globally unique key naming one outstanding request: the issuing origin
/// plus that origin's request counter. This is the bin's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId {
    /// The endpoint instance that issued the request
    pub origin: OriginId,
    /// The origin-local request counter value
    pub request_number: u64,
}

impl RequestId {
    /// Construct a request identifier
    pub fn new(origin: OriginId, request_number: u64) -> Self {
        Self {
            origin,
            request_number,
        }
    }
}

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An in-memory response-correlation store ("the bin") for asynchronous
//! peer-messaging systems.
//!
//! # Overview
//! In a request/response messaging layer, the handler that produces a result
//! and the consumer that eventually collects it run on different threads at
//! different times. The bin is the staging area between them: producers
//! [`add`](ResponseBin::add) a payload keyed by a [`RequestId`], and
//! consumers remove it through one of three retrieval modes —
//! [`acquire_for_identifier`](ResponseBin::acquire_for_identifier) for an
//! exact request, [`acquire_for_origin`](ResponseBin::acquire_for_origin) for
//! any result belonging to one issuing endpoint, or
//! [`acquire_any`](ResponseBin::acquire_any) for the oldest pending result.
//! Every successful retrieval transfers ownership of the payload to the
//! caller; a given record is delivered at most once.
//!
//! The bin protects itself against consumers that never show up. It enforces
//! an optional byte capacity by silently evicting the oldest records on
//! overflow, and an external periodic task is expected to call
//! [`sweep_decay`](ResponseBin::sweep_decay) to discard records older than
//! the configured lifetime. Neither mechanism reports anything to anyone;
//! a shed record is simply a later miss.
//!
//! All operations serialize on one reentrant guard, so any sequence of them
//! can be composed into a single atomic unit with
//! [`with_exclusive`](ResponseBin::with_exclusive).
//!
//! The wire protocol, the dispatch table that routes requests to handlers,
//! and the payload contents themselves are all outside this crate: payloads
//! only need to implement [`Payload`], which reports a byte weight and a
//! type tag.
//!
//! # Example
//! ```
//! use response_bin::{OriginId, Payload, RequestId, ResponseBin, SizeOf};
//!
//! struct Reply(Vec<u8>);
//!
//! impl SizeOf for Reply {
//!     fn size_of(&self) -> usize {
//!         self.0.len()
//!     }
//! }
//!
//! impl Payload for Reply {
//!     fn type_tag(&self) -> u32 {
//!         7
//!     }
//! }
//!
//! // 64 KiB of staged results, default 30s lifetime
//! let bin: ResponseBin<Reply> = ResponseBin::new(Some(64 * 1024), None);
//!
//! let origin = OriginId::new("transfer-agent", 4242, 1, 0x5eed);
//! let request = RequestId::new(origin.clone(), 1);
//!
//! bin.add(Reply(b"done".to_vec()), request.clone()).unwrap();
//! assert_eq!(bin.count_items(), 1);
//! assert_eq!(bin.count_origins(), 1);
//!
//! // The consumer collects the result; ownership moves out of the bin.
//! let reply = bin.acquire_for_identifier(&request).unwrap();
//! assert_eq!(reply.0, b"done");
//! assert_eq!(bin.count_items(), 0);
//!
//! // A second collection of the same request is a miss.
//! assert!(bin.acquire_for_identifier(&request).is_none());
//! ```

#![warn(missing_docs)]

pub mod errors;
pub mod store;
pub mod types;

pub use errors::BinError;
pub use store::ResponseBin;
pub use types::{OriginId, Payload, RequestId, SizeOf};

// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON layer dumps for scanout diagnostics.
//!
//! - [`pretty::PrettyPrintSink`] — a [`TraceSink`](scanout_core::trace::TraceSink)
//!   writing one human-readable line per present-cycle event.
//! - [`dump`] — JSON descriptions of overlay layers for bug reports and
//!   post-mortem analysis.

pub mod dump;
pub mod pretty;

// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # binscope
//!
//! Static program-structure recovery for compiled binaries. Given a
//! procedure's decoded instruction stream and its debug line tables,
//! `binscope` reconstructs a hierarchical scope tree — load module, source
//! files, procedures, loops, and statement ranges — by analyzing the
//! procedure's control-flow graph and correlating instruction addresses back
//! to source lines. Performance tools annotate this tree with runtime
//! metrics; compilers-adjacent tooling uses it to reason about recovered
//! loop nests.
//!
//! ## Features
//!
//! - **Control-flow recovery** - Basic-block partitioning, dominator trees,
//!   and back-edge detection over raw instruction streams
//! - **Interval analysis** - Tarjan-style nested strongly-connected-region
//!   decomposition that finds natural and irreducible loops
//! - **Alien-code relocation** - Heuristic file/procedure classification
//!   that moves inlined code to synthesized scopes instead of mislabeling it
//! - **Tree normalization** - Duplicate-statement coalescing, perfect
//!   loop-nest fusion, empty-scope pruning, and path-based file filtering
//!
//! ## Quick Start
//!
//! ```rust
//! use binscope::prelude::*;
//!
//! // A two-instruction procedure and its line table.
//! let record = ProcedureRecord {
//!     name: "main".into(),
//!     link_name: "main".into(),
//!     file_name: Some("main.c".into()),
//!     begin_vma: 0x1000,
//!     end_vma: 0x1008,
//!     begin_line: 3,
//! };
//! let instructions = vec![
//!     Instruction::simple(0x1000, 4),
//!     Instruction::ret(0x1004, 4),
//! ];
//! let mut resolver = MapResolver::new();
//! resolver.insert_full(0x1000, "main", "main.c", 3);
//!
//! let config = StructureConfig::default();
//! let tree = build_and_normalize(
//!     &config,
//!     &resolver,
//!     "a.out",
//!     &[(record, instructions)],
//! )?;
//! assert!(tree.children(tree.root()).len() == 1);
//! # Ok::<(), binscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! The pipeline runs leaves-first:
//!
//! - [`binutils`] - Decoded-binary input model: instructions, procedure
//!   records, and the [`binutils::SourceResolver`] line-table trait
//! - [`cfg`] - The instruction-stream adapter and CFG construction
//! - [`graph`] - Generic graph container and the shared algorithms
//!   (traversals, dominators, strongly connected components)
//! - [`interval`] - Nested region decomposition of a CFG
//! - [`structure`] - Loop-nest building and statement placement, producing
//!   a raw [`scope::ScopeTree`]
//! - [`normalize`] - The four normalization passes that clean the raw tree
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Recoverable failures (empty inputs, a broken CFG) surface as
//! [`Result<T, Error>`](Result). Invariant violations — an inverted address
//! range, an unimplemented adapter query — abort via assertion, since they
//! indicate corrupted input models rather than conditions a caller can
//! handle.

pub mod binutils;
pub mod cfg;
pub mod graph;
pub mod interval;
pub mod normalize;
pub mod prelude;
pub mod scope;
pub mod structure;
pub mod vma;

mod error;

pub use error::Error;

/// Convenience `Result` type carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

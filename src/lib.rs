//! # Dep Doctor
//!
//! Diagnoses and resolves version conflicts in an installed Python
//! environment.
//!
//! Given a dependency tree dumped by an external enumerator, this crate
//! normalizes it into a canonical graph, detects every unsatisfied
//! requirement edge, computes a minimal-change upgrade plan against a
//! package index, and can enact that plan through a narrow package-manager
//! adapter. Lock/restore snapshots let an environment be reproduced later.
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     <http://www.apache.org/licenses/LICENSE-2.0>
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.
//!
//! ## Architecture
//!
//! - **Core**: version/specifier algebra, shared types, error taxonomy, seam traits
//! - **Normalize**: enumerator JSON -> canonical dependency graph
//! - **Index**: package-index metadata client
//! - **Resolver**: conflict detection and plan computation
//! - **Executor**: enacts a plan through a package-manager adapter
//! - **Lock**: environment snapshot and restore
//! - **Report**: text and JSON report rendering

pub mod core;
pub mod executor;
pub mod index;
pub mod lock;
pub mod normalize;
pub mod report;
pub mod resolver;

pub use core::{Error, Result};

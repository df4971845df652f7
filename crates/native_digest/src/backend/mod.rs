// Copyright (C) Microsoft Corporation. All rights reserved.

//! Native backend selection.
//!
//! A backend is one native library binding, fixed for the lifetime of the
//! process. Selection is data driven: the [`BackendRegistry`] lists
//! [`BackendDescriptor`]s in preference order, and the prober binds the first
//! one whose library loads and whose entry points all resolve.
//!
//! # Components
//!
//! - `descriptor`: ABI generations, canonical entry points and the symbol
//!   names each generation exports for them
//! - `registry`: candidate library names per platform, newest generation first
//! - `loader`: the dynamic loading seam and its `libloading` implementation
//! - `entry_points`: typed function-pointer table built from resolved symbols
//! - `prober`: the probing pass, its memoization and the process-wide slot

mod descriptor;
mod entry_points;
mod loader;
mod prober;
mod registry;

pub use descriptor::*;
pub(crate) use entry_points::*;
pub use loader::*;
pub use prober::*;
pub use registry::*;

use super::*;

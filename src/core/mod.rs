//! Core domain logic: secure I/O (C1), path decisions (C2), the patch engine
//! (C3-C6), the clipboard store (C7-C10), loopback classification, and
//! process-tree termination (C12).

pub mod clipboard;
pub mod loopback;
pub mod patch;
pub mod path_decision;
pub mod process;
pub mod secure_io;

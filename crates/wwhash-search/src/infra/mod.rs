//! Infrastructure layer - I/O and external dependencies
//!
//! This module handles file operations and other external dependencies.

pub mod checkpoint_io;
pub mod ngram_io;
pub mod process_setup;
pub mod report_io;
pub mod resource_monitor;
pub mod targets_io;
pub mod wordlist_io;

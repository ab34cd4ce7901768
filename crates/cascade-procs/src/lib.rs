#![warn(missing_docs)]

//! Processor protocol for the cascade pipeline.
//!
//! A [`Proc`] turns one chunk into a finite stream of results; composers
//! wrap processors to discard output, observe stream termination, or run a
//! closure in place. Pipelines are built by chaining and fanning out
//! processors and multiplexing their result streams.

pub mod checksum;
pub mod compose;
pub mod error;
pub mod finish;
pub mod proc;

pub use checksum::Checksum;
pub use compose::{DiscardChunks, OnEnd};
pub use error::ProcError;
pub use finish::finish_first_err;
pub use proc::{read_chunks, InplaceFunc, Nop, Proc, Res, ResStream};

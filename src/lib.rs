//! Runs graph traversals as vertex programs on a bulk-synchronous-parallel
//! (Pregel) engine. Traversers travel between vertices as messages, are
//! merged per vertex, and retire once they reach the end of the pipeline.

mod channel;
mod worker;

mod config;
pub use config::*;

mod context;
pub use context::*;

mod element;
pub use element::*;

mod error;
pub use error::*;

mod generate;
pub use generate::*;

mod mapreduce;
pub use mapreduce::*;

mod master;
pub use master::*;

mod memory;
pub use memory::*;

mod message;
pub use message::*;

mod path;
pub use path::*;

mod program;
pub use program::*;

mod steps;
pub use steps::*;

mod tracker;
pub use tracker::*;

mod traversal;
pub use traversal::*;

mod traverser;
pub use traverser::*;

mod vertex;
pub use vertex::*;

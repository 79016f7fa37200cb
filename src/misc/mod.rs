mod hashmap;
pub mod node_queue;

pub use hashmap::*;

pub mod graph;
pub mod ws;

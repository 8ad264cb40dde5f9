//! Query-time retrieval

mod search;

pub use search::RetrievalEngine;

//! Student portal: typed flat-file record stores and the HTTP service over
//! them.

pub mod backend;

//! Domain model module declarations.

pub mod search_result;

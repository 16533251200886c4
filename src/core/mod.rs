/// Account hierarchy: flattening and rebuilding
pub mod accounts;
/// Tolerant date parsing, formatting and relative ages
pub mod dates;
/// Bolívar amount formatting
pub mod money;
/// Text rendering of account tables
pub mod report;
/// Lenient ids and field decoders for loosely typed documents
pub mod values;

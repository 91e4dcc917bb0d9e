//! Data model types sent by the publisher.
//!
//! - `quote` — synthetic quote payloads and their JSON shapes.
pub mod quote;

pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{multipart_etag, seeded_bytes, write_file};
#[allow(unused_imports)]
pub use mocks::{
    ScriptedBackend, ScriptedExistence, ScriptedHasher, ScriptedLookup, StalledBackend,
    TruncatingBackend,
};

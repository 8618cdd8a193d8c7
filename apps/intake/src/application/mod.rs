//! Application record assembly. Turns resolved contact fields plus storage
//! coordinates into the record that gets persisted.

pub mod builder;

pub use builder::ApplicationBuilder;

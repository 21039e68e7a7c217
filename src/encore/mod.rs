//! Webpack Encore build output.

pub mod entrypoints;

pub use entrypoints::{
    EncoreError, EntrypointLookup, EntrypointLookupCollection, DEFAULT_BUILD, ENTRYPOINTS_FILE,
};

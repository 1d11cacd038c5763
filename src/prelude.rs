//! The athenacl prelude.
//!
//! The purpose of this module is to alleviate imports of the common athenacl types:
//!
//! ```
//! # #![allow(unused_imports)]
//! use athenacl::prelude::*;
//! ```

pub use super::{
    // composition building blocks
    clone::CloneRole,
    event_list::MappedEvent,
    parameter::{names, Argument, ReprFormat},
    session::TuningMode,
    texture::{texture_module_names, PolyphonyMode, Role},
    unit::BoundaryMethod,
    writer::{default_writers, CsoundScoreWriter, DocumentWriter, TextWriter, WriteReport},
    // all public basic types
    Error,
    Event,
    EventList,
    EventMode,
    FilterObject,
    GeneratorObject,
    Library,
    Multiset,
    Orchestra,
    OutputFormat,
    Path,
    Pitch,
    Pulse,
    ReferenceState,
    Rhythm,
    RhythmObject,
    SelectionMode,
    Selector,
    Session,
    SessionOptions,
    SetClass,
    Sieve,
    StaticObject,
    Temperament,
    Texture,
    TextureClone,
    TextureSeeds,
    Value,
    Writer,
};

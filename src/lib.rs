//! A generative algorithmic composition engine: parameter objects produce streams of
//! values, textures turn them into events along paths of pitch collections, clones
//! transform texture events, and event lists merge and write everything.

pub mod error;
pub use error::Error;

pub mod seed;
pub mod unit;

pub mod sieve;
pub use sieve::Sieve;

pub mod pitch;
pub use pitch::Pitch;
pub mod multiset;
pub use multiset::{Multiset, SetClass};
pub mod path;
pub use path::Path;
pub mod temperament;
pub use temperament::Temperament;

pub mod pulse;
pub use pulse::{Pulse, Rhythm};

pub mod selector;
pub use selector::{SelectionMode, Selector};

pub mod automata;
pub mod feedback;
pub mod genetic;
pub mod grammar;
pub mod markov;

pub mod parameter;
pub use parameter::{
    FilterObject, GeneratorObject, Library, ReferenceState, RhythmObject, StaticObject, Value,
};

pub mod orchestra;
pub use orchestra::Orchestra;

pub mod event;
pub use event::Event;

pub mod texture;
pub use texture::{Texture, TextureSeeds};
pub mod clone;
pub use clone::TextureClone;

pub mod event_list;
pub use event_list::{EventList, EventMode, OutputFormat};
pub mod writer;
pub use writer::Writer;

pub mod session;
pub use session::{Session, SessionOptions};

pub mod prelude;

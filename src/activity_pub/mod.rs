mod actor_store;
mod delivery;
mod inbox;

pub mod model;
pub mod validate;

pub use actor_store::ActorStore;
pub use delivery::{Delivery, prepare_delivery};
pub use inbox::{Delivered, Inbox, InboxError};
pub use model::{
    Activity, ActivityBuilder, ActivityType, Actor, Collection, Document, Link, Object, OneOrMany,
    Reference, SchemaViolation, ValidationError,
};

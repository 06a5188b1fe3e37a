//! ActivityPub federation core: typed ActivityStreams documents with
//! aggregated validation, plus digest and HTTP signature authentication
//! through [`httpsig`].

pub mod activity_pub;
pub mod config;

pub use httpsig;

//! Core FAQ data structures

pub mod codec;
mod edge;
mod group;
mod node;
mod score;


pub use codec::{decode_node, decode_nodes, encode_node, DecodeError};
pub use edge::{Connection, ConnectionId, ConnectionType};
pub use group::{FaqGroup, GroupId};
pub use node::{
    content_hash, AlgorithmProps, FaqNode, LanguageFeatures, NodeId, NodeMetadata, Properties,
    PropertyValue, Resource, SearchIndex,
};
pub use score::Score;

mod consts;

#[cfg(feature = "embeder")]
mod embeder;
#[cfg(feature = "pinecone")]
mod pinecone;
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "embeder")]
pub use embeder::{EmbederClient, EmbeddingEndpoint};
#[cfg(feature = "pinecone")]
pub use pinecone::{PineconeClient, PineconeIndex, VectorRecord};
#[cfg(feature = "postgres")]
pub use postgres::PostgresClient;

pub use consts::*;

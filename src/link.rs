//! Core link domain primitives (identifiers, environments, products, records).

pub mod credential;
pub mod environment;
pub mod id;
pub mod product;
pub mod record;

pub use credential::*;
pub use environment::*;
pub use id::*;
pub use product::*;
pub use record::*;

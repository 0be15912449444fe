mod database {
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod shopping_list;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod middleware;
    pub mod permissions;
    pub mod session;
}
mod media {
    pub mod codec;
    pub mod storage;
}
mod cache {
    pub mod cache;
}

pub mod api;
pub mod config;
pub mod constants;
pub mod context;
pub mod validation;

pub use authentication::*;
pub use cache::cache::*;
pub use database::*;
pub use media::*;

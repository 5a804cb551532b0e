pub mod explodes;
pub mod mapping;
pub mod subscription;

pub use subscription::{
    decode_subscription, response_headers, Disposition, RemoteResponse, SubscriptionType,
};

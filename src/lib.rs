pub mod executor;
pub mod stats;

pub mod input_user;
pub mod replay;

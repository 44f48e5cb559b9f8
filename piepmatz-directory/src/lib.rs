pub mod client;
pub mod record;

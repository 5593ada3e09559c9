pub mod dry;
pub mod error;
pub mod ok;
pub mod skip;
pub mod substitute;
pub mod timeout;

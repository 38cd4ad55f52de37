pub mod assets;
pub mod response;
pub mod time;
pub mod validation;

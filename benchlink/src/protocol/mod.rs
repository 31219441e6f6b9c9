pub mod lineio;
pub mod scpi;

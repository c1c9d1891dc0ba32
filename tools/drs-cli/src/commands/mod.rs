pub mod analyze;
pub mod info;
pub mod init;
pub mod replay;
pub mod synth;
pub mod validate;

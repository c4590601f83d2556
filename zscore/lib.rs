#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod batch;
pub mod calculation;
pub mod config;
pub mod io;
pub mod preprocess;
pub mod scheme;
pub mod types;
pub mod value;

#![allow(dead_code)]

pub mod utils;
pub mod ws;

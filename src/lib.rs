#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod chunk;
pub mod cli;

mod archive;
mod config;
mod error;
mod format;
mod hash;
mod logger;
mod ops;
mod remote;
mod retention;
mod stats;
mod storage;
mod task;

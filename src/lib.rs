pub mod cli;
pub mod coordinator;
pub mod driver;
pub mod emitter;
pub mod errs;
pub mod fisher;
pub mod logging;
pub mod pileup;
pub mod quality;
pub mod segmenter;

pub mod filter;
pub mod output;
pub mod pcm;
pub mod schedule;

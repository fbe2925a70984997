pub mod archive;
pub mod cache;
pub mod clock;
pub mod config;
pub mod display;
pub mod fetch;
pub mod filter;
pub mod realtime;
pub mod resolver;
pub mod schedule;
pub mod server;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

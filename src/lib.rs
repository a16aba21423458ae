// Library for the server and polling binaries, and for tests

pub mod aggregation;
pub mod config;
pub mod event_store;
pub mod logging;
pub mod models;
pub mod poller;
pub mod routes;
pub mod widget;

//! Integration tests for weaver
//!
//! Every test starts an in-process server on a random local port with its
//! own worker file and talks to it over real HTTP.

mod helpers;

mod dispatch;
mod http_basic;
mod workers;

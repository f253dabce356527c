pub mod assistant;
pub mod config;
pub mod routes;
pub mod sandbox;
pub mod steps;
pub mod web_server;

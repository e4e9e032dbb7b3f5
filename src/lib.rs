//! # Food Catalog
//!
//! A read-only catalog of food products with a JSON query API and a
//! terminal browser.
//!
//! Products are imported from JSON records or fetched from OpenFoodFacts
//! into SQLite, served by an
//! HTTP API with filtering, sorting, pagination and aggregate statistics, and
//! browsed from a terminal client that talks to that API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │ files / OFF │──▶│   Ingest    │──▶│  SQLite  │
//! │   records   │   │ clean+upsert│   │ products │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐     ┌──────────┐
//!                 │   CLI    │       │   HTTP   │◀────│  Browse  │
//!                 │(foodcat) │       │   /api   │     │  client  │
//!                 └──────────┘       └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! foodcat init                       # create database
//! foodcat import products.json       # load cleaned records
//! foodcat fetch 3017620422003        # or pull from OpenFoodFacts
//! foodcat serve                      # start the API
//! foodcat browse                     # browse it from a terminal
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Products, grades and tag lists |
//! | [`query`] | Request parameters, filters and the parameter policy |
//! | [`store`] | Catalog store trait and in-memory backend |
//! | [`sqlite_store`] | SQLite catalog store |
//! | [`catalog`] | Paged product listing |
//! | [`server`] | HTTP query service |
//! | [`error`] | API error responses |
//! | [`client`] | HTTP client for the query service |
//! | [`view`] | Browser view-model |
//! | [`browse`] | Interactive terminal browser |
//! | [`ingest`] | Record import |
//! | [`fetch`] | OpenFoodFacts product fetch |
//! | [`export`] | JSON export |
//! | [`stats`] | Catalog statistics |
//! | [`get`] | Single product lookup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod browse;
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod fetch;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod query;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod store;
pub mod view;

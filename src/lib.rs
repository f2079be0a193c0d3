//! Budowlanka: the website of a construction company, with a portfolio of
//! realizations, an appointment calendar, contact forms and an admin area.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod form;
pub mod logging;
pub mod mail;
pub mod pagination;
pub mod templates;
pub mod web;

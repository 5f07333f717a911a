//! # Kinobot
//!
//! A Telegram bot that lets users look films up on Wikipedia, rate them,
//! write reviews and browse the films rated so far, driven by a menu
//! dialogue with exact Back navigation.

pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod models;
pub mod services;
pub mod storage;

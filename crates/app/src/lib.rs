#![deny(unsafe_code)]

/// Chat application shell.
///
/// This crate provides a desktop chat client built with GPUI and
/// gpui-component: a live message feed over a GraphQL subscription plus a
/// composer that posts messages through the shared transport.
pub mod app;
/// Chat domain contracts and components.
pub mod chat;
/// Settings persistence.
pub mod settings;

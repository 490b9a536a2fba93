#![allow(dead_code)]

pub mod api_app;
pub mod browser;
pub mod fakes;

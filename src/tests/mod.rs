pub mod common;
mod daily_check;
